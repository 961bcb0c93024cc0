//! Parse error types and diagnostic rendering

use crate::token::{Span, Token};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use std::fmt;
use termcolor::Buffer;

/// A parse error with location and contextual information.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The kind of error that occurred
    pub kind: ParseErrorKind,

    /// Source location of the error
    pub span: Span,

    /// Human-readable error message
    pub message: String,

    /// Optional suggestion for fixing the error
    pub suggestion: Option<String>,
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Input the lexer could not recognize
    UnexpectedCharacter {
        /// The offending text
        text: String,
    },

    /// Unexpected token found
    UnexpectedToken {
        /// Description of what was expected
        expected: String,
        /// The token actually found
        found: Token,
    },

    /// Unexpected end of file
    UnexpectedEof {
        /// Description of what was expected
        expected: String,
    },

    /// Invalid syntax
    InvalidSyntax {
        /// Why the construct is invalid
        reason: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at {}:{}: {}",
            self.span.line, self.span.column, self.message
        )?;

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// Create an "unexpected token" error.
    pub fn unexpected_token(expected: impl Into<String>, found: Token, span: Span) -> Self {
        let expected = expected.into();
        let message = format!("Expected {expected}, found `{found}`");
        Self {
            kind: ParseErrorKind::UnexpectedToken { expected, found },
            span,
            message,
            suggestion: None,
        }
    }

    /// Create an "unexpected end of file" error.
    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        let expected = expected.into();
        let message = format!("Unexpected end of input, expected {expected}");
        Self {
            kind: ParseErrorKind::UnexpectedEof { expected },
            span,
            message,
            suggestion: None,
        }
    }

    /// Create an "invalid syntax" error.
    pub fn invalid_syntax(reason: impl Into<String>, span: Span) -> Self {
        let reason = reason.into();
        Self {
            message: reason.clone(),
            kind: ParseErrorKind::InvalidSyntax { reason },
            span,
            suggestion: None,
        }
    }

    /// Attach a suggestion to the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Render a parse error as a source-annotated diagnostic.
///
/// `name` labels the input (typically a file name) in the rendered output.
pub fn render_parse_error(name: &str, source: &str, error: &ParseError) -> String {
    let file = SimpleFile::new(name, source);
    let mut labels = vec![Label::primary((), error.span.start..error.span.end)];
    if let Some(suggestion) = &error.suggestion {
        labels.push(Label::secondary((), error.span.start..error.span.end)
            .with_message(suggestion.clone()));
    }
    let diagnostic = Diagnostic::error()
        .with_message(error.message.clone())
        .with_labels(labels);

    let mut buffer = Buffer::no_color();
    let config = term::Config::default();
    // Rendering failures degrade to the plain Display form
    if term::emit(&mut buffer, &config, &file, &diagnostic).is_err() {
        return error.to_string();
    }
    String::from_utf8_lossy(buffer.as_slice()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position() {
        let error = ParseError::unexpected_token(
            "`;`",
            Token::RBrace,
            Span::new(10, 11, 2, 5),
        );
        let text = error.to_string();
        assert!(text.contains("2:5"));
        assert!(text.contains('}'));
    }

    #[test]
    fn test_render_annotates_source() {
        let source = "class Counter {\n  count int;\n}\n";
        let error = ParseError::unexpected_token(
            "`:`",
            Token::Ident("int".to_string()),
            Span::new(24, 27, 2, 9),
        );
        let rendered = render_parse_error("counter.opal", source, &error);
        assert!(rendered.contains("counter.opal"));
        assert!(rendered.contains("count int;"));
    }
}
