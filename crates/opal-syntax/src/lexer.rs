//! Lexer for the Opal programming language
//!
//! Implemented with the logos library; converts source text into a stream of
//! tokens with precise source location information.

use crate::error::{ParseError, ParseErrorKind};
use crate::token::{Span, Token};
use logos::Logos;

/// Logos-based token enum for lexing.
///
/// Used internally by logos for efficient tokenization and converted to the
/// public [`Token`] enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    // Keywords (must come before identifiers)
    #[token("class")]
    Class,

    #[token("extends")]
    Extends,

    #[token("implements")]
    Implements,

    #[token("function")]
    Function,

    #[token("let")]
    Let,

    #[token("return")]
    Return,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("new")]
    New,

    #[token("this")]
    This,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("public")]
    Public,

    #[token("private")]
    Private,

    #[token("protected")]
    Protected,

    #[token("static")]
    Static,

    #[token("final")]
    Final,

    #[token("abstract")]
    Abstract,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, lex_string)]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Punctuation
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("@")]
    At,

    // Operators
    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    Le,

    #[token(">=")]
    Ge,

    #[token("=")]
    Assign,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("!")]
    Bang,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,
}

/// Unescape a quoted string literal
fn lex_string(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Byte offsets at which each line starts, for position lookups
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = offset - self.starts[line] + 1;
        (line as u32 + 1, column as u32)
    }
}

/// Tokenize source text into spanned tokens
///
/// Fails on the first unrecognized character or malformed literal.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = LogosToken::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let (line, column) = index.position(range.start);
        let span = Span::new(range.start, range.end, line, column);

        let logos_token = match result {
            Ok(token) => token,
            Err(()) => {
                return Err(ParseError {
                    kind: ParseErrorKind::UnexpectedCharacter {
                        text: lexer.slice().to_string(),
                    },
                    span,
                    message: format!("Unrecognized input `{}`", lexer.slice()),
                    suggestion: None,
                });
            }
        };

        let token = match logos_token {
            LogosToken::Whitespace | LogosToken::LineComment => continue,
            LogosToken::Class => Token::Class,
            LogosToken::Extends => Token::Extends,
            LogosToken::Implements => Token::Implements,
            LogosToken::Function => Token::Function,
            LogosToken::Let => Token::Let,
            LogosToken::Return => Token::Return,
            LogosToken::If => Token::If,
            LogosToken::Else => Token::Else,
            LogosToken::While => Token::While,
            LogosToken::New => Token::New,
            LogosToken::This => Token::This,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Null => Token::Null,
            LogosToken::Public => Token::Public,
            LogosToken::Private => Token::Private,
            LogosToken::Protected => Token::Protected,
            LogosToken::Static => Token::Static,
            LogosToken::Final => Token::Final,
            LogosToken::Abstract => Token::Abstract,
            LogosToken::Float(v) => Token::Float(v),
            LogosToken::Int(v) => Token::Int(v),
            LogosToken::Str(s) => Token::Str(s),
            LogosToken::Ident(name) => Token::Ident(name),
            LogosToken::LBrace => Token::LBrace,
            LogosToken::RBrace => Token::RBrace,
            LogosToken::LParen => Token::LParen,
            LogosToken::RParen => Token::RParen,
            LogosToken::LBracket => Token::LBracket,
            LogosToken::RBracket => Token::RBracket,
            LogosToken::Comma => Token::Comma,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Colon => Token::Colon,
            LogosToken::Dot => Token::Dot,
            LogosToken::At => Token::At,
            LogosToken::EqEq => Token::EqEq,
            LogosToken::NotEq => Token::NotEq,
            LogosToken::Le => Token::Le,
            LogosToken::Ge => Token::Ge,
            LogosToken::Assign => Token::Assign,
            LogosToken::Lt => Token::Lt,
            LogosToken::Gt => Token::Gt,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::Bang => Token::Bang,
            LogosToken::AndAnd => Token::AndAnd,
            LogosToken::OrOr => Token::OrOr,
        };
        tokens.push((token, span));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("class Counter extends Base"),
            vec![
                Token::Class,
                Token::Ident("Counter".to_string()),
                Token::Extends,
                Token::Ident("Base".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5"),
            vec![Token::Int(42), Token::Float(3.5)]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n""#),
            vec![Token::Str("a\"b\n".to_string())]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= && || = < >"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::Le,
                Token::Ge,
                Token::AndAnd,
                Token::OrOr,
                Token::Assign,
                Token::Lt,
                Token::Gt,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("let x // trailing\nlet"),
            vec![Token::Let, Token::Ident("x".to_string()), Token::Let]
        );
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("let\n  x").unwrap();
        assert_eq!(tokens[0].1.line, 1);
        assert_eq!(tokens[0].1.column, 1);
        assert_eq!(tokens[1].1.line, 2);
        assert_eq!(tokens[1].1.column, 3);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("let $x").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::UnexpectedCharacter { .. }
        ));
        assert_eq!(err.span.column, 5);
    }
}
