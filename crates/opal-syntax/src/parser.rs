//! Recursive-descent parser for the Opal language

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::tokenize;
use crate::token::{Span, Token};

/// Parse source text into a [`Program`]
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ===== Token helpers =====

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, context: &str) -> Result<Span, ParseError> {
        match self.advance() {
            Some((found, span)) if found == token => Ok(span),
            Some((found, span)) => Err(ParseError::unexpected_token(
                format!("`{token}` {context}"),
                found,
                span,
            )),
            None => Err(ParseError::unexpected_eof(
                format!("`{token}` {context}"),
                self.peek_span(),
            )),
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<String, ParseError> {
        match self.advance() {
            Some((Token::Ident(name), _)) => Ok(name),
            Some((found, span)) => Err(ParseError::unexpected_token(
                format!("identifier {context}"),
                found,
                span,
            )),
            None => Err(ParseError::unexpected_eof(
                format!("identifier {context}"),
                self.peek_span(),
            )),
        }
    }

    /// Dotted name: `Ident (. Ident)*`
    fn parse_qualified_name(&mut self, context: &str) -> Result<String, ParseError> {
        let mut name = self.expect_ident(context)?;
        while self.eat(&Token::Dot) {
            name.push('.');
            name.push_str(&self.expect_ident(context)?);
        }
        Ok(name)
    }

    // ===== Declarations =====

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut classes = Vec::new();
        while self.peek().is_some() {
            classes.push(self.parse_class_decl()?);
        }
        Ok(Program { classes })
    }

    fn parse_class_decl(&mut self) -> Result<ClassDecl, ParseError> {
        let annotations = self.parse_annotations()?;
        let modifiers = self.parse_modifiers();
        let span = self.expect(Token::Class, "to begin a class declaration")?;
        let name = self.expect_ident("after `class`")?;

        let superclass = if self.eat(&Token::Extends) {
            Some(self.parse_qualified_name("after `extends`")?)
        } else {
            None
        };

        let mut interfaces = Vec::new();
        if self.eat(&Token::Implements) {
            interfaces.push(self.parse_qualified_name("after `implements`")?);
            while self.eat(&Token::Comma) {
                interfaces.push(self.parse_qualified_name("after `,`")?);
            }
        }

        self.expect(Token::LBrace, "to open the class body")?;
        let mut members = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(ParseError::unexpected_eof(
                    "`}` to close the class body",
                    self.peek_span(),
                ));
            }
            members.push(self.parse_member()?);
        }

        Ok(ClassDecl {
            annotations,
            modifiers,
            name,
            superclass,
            interfaces,
            members,
            span,
        })
    }

    fn parse_annotations(&mut self) -> Result<Vec<Annotation>, ParseError> {
        let mut annotations = Vec::new();
        while self.eat(&Token::At) {
            let name = self.parse_qualified_name("after `@`")?;
            let mut values = Vec::new();
            if self.eat(&Token::LParen) {
                if !self.eat(&Token::RParen) {
                    loop {
                        let key = self.expect_ident("as an annotation value name")?;
                        self.expect(Token::Assign, "after the annotation value name")?;
                        values.push((key, self.parse_literal()?));
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(Token::RParen, "to close the annotation values")?;
                }
            }
            annotations.push(Annotation { name, values });
        }
        Ok(annotations)
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.peek() {
                Some(Token::Public) => Modifier::Public,
                Some(Token::Private) => Modifier::Private,
                Some(Token::Protected) => Modifier::Protected,
                Some(Token::Static) => Modifier::Static,
                Some(Token::Final) => Modifier::Final,
                Some(Token::Abstract) => Modifier::Abstract,
                _ => break,
            };
            self.pos += 1;
            modifiers.push(modifier);
        }
        modifiers
    }

    fn parse_member(&mut self) -> Result<Member, ParseError> {
        let annotations = self.parse_annotations()?;
        let modifiers = self.parse_modifiers();
        if self.peek() == Some(&Token::Function) {
            self.parse_method(annotations, modifiers).map(Member::Method)
        } else {
            self.parse_field(annotations, modifiers).map(Member::Field)
        }
    }

    fn parse_field(
        &mut self,
        annotations: Vec<Annotation>,
        modifiers: Vec<Modifier>,
    ) -> Result<FieldDecl, ParseError> {
        let span = self.peek_span();
        let name = self.expect_ident("as a field name")?;
        self.expect(Token::Colon, "after the field name")?;
        let ty = self.parse_type()?;
        let initializer = if self.eat(&Token::Assign) {
            Some(self.parse_literal()?)
        } else {
            None
        };
        self.expect(Token::Semicolon, "after the field declaration")?;
        Ok(FieldDecl {
            annotations,
            modifiers,
            name,
            ty,
            initializer,
            span,
        })
    }

    fn parse_method(
        &mut self,
        annotations: Vec<Annotation>,
        modifiers: Vec<Modifier>,
    ) -> Result<MethodDecl, ParseError> {
        let span = self.expect(Token::Function, "to begin a method")?;
        let name = self.expect_ident("after `function`")?;

        self.expect(Token::LParen, "to open the parameter list")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let param_name = self.expect_ident("as a parameter name")?;
                self.expect(Token::Colon, "after the parameter name")?;
                params.push(Param {
                    name: param_name,
                    ty: self.parse_type()?,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen, "to close the parameter list")?;
        }

        let return_type = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = if self.eat(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_block()?)
        };

        Ok(MethodDecl {
            annotations,
            modifiers,
            name,
            params,
            return_type,
            body,
            span,
        })
    }

    fn parse_type(&mut self) -> Result<TypeAnnotation, ParseError> {
        let name = self.parse_qualified_name("as a type name")?;
        let mut ty = TypeAnnotation::Named(name);
        while self.eat(&Token::LBracket) {
            self.expect(Token::RBracket, "to close the array type")?;
            ty = TypeAnnotation::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        match self.advance() {
            Some((Token::Int(v), _)) => Ok(Literal::Int(v)),
            Some((Token::Float(v), _)) => Ok(Literal::Float(v)),
            Some((Token::Str(s), _)) => Ok(Literal::Str(s)),
            Some((Token::True, _)) => Ok(Literal::Bool(true)),
            Some((Token::False, _)) => Ok(Literal::Bool(false)),
            Some((Token::Null, _)) => Ok(Literal::Null),
            Some((Token::Minus, span)) => match self.advance() {
                Some((Token::Int(v), _)) => Ok(Literal::Int(-v)),
                Some((Token::Float(v), _)) => Ok(Literal::Float(-v)),
                _ => Err(ParseError::invalid_syntax(
                    "Expected a numeric literal after `-`",
                    span,
                )),
            },
            Some((found, span)) => Err(ParseError::unexpected_token("a literal", found, span)),
            None => Err(ParseError::unexpected_eof("a literal", self.peek_span())),
        }
    }

    // ===== Statements =====

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect(Token::LBrace, "to open a block")?;
        let mut statements = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(ParseError::unexpected_eof(
                    "`}` to close the block",
                    self.peek_span(),
                ));
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek() {
            Some(Token::Let) => {
                self.pos += 1;
                let name = self.expect_ident("after `let`")?;
                let ty = if self.eat(&Token::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                self.expect(Token::Assign, "in the `let` declaration")?;
                let init = self.parse_expression()?;
                self.expect(Token::Semicolon, "after the `let` declaration")?;
                Ok(Statement::Let { name, ty, init })
            }
            Some(Token::Return) => {
                self.pos += 1;
                let value = if self.peek() == Some(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(Token::Semicolon, "after `return`")?;
                Ok(Statement::Return(value))
            }
            Some(Token::If) => {
                self.pos += 1;
                self.expect(Token::LParen, "after `if`")?;
                let condition = self.parse_expression()?;
                self.expect(Token::RParen, "to close the `if` condition")?;
                let then_block = self.parse_block()?;
                let else_block = if self.eat(&Token::Else) {
                    Some(self.parse_block()?)
                } else {
                    None
                };
                Ok(Statement::If {
                    condition,
                    then_block,
                    else_block,
                })
            }
            Some(Token::While) => {
                self.pos += 1;
                self.expect(Token::LParen, "after `while`")?;
                let condition = self.parse_expression()?;
                self.expect(Token::RParen, "to close the `while` condition")?;
                let body = self.parse_block()?;
                Ok(Statement::While { condition, body })
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(Token::Semicolon, "after the expression")?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    // ===== Expressions =====

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_binary(1)?;
        if self.peek() == Some(&Token::Assign) {
            let span = self.peek_span();
            self.pos += 1;
            if !matches!(expr, Expression::Ident(_) | Expression::Field { .. }) {
                return Err(ParseError::invalid_syntax(
                    "Invalid assignment target",
                    span,
                ));
            }
            let value = self.parse_assignment()?;
            return Ok(Expression::Assign {
                target: Box::new(expr),
                value: Box::new(value),
            });
        }
        Ok(expr)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        Some(match self.peek()? {
            Token::OrOr => BinaryOp::Or,
            Token::AndAnd => BinaryOp::And,
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Rem,
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let operand = self.parse_unary()?;
            // Fold negated numeric literals so printing `-1` reparses to the
            // same node instead of a unary expression
            if op == UnaryOp::Neg {
                match operand {
                    Expression::Literal(Literal::Int(v)) => {
                        return Ok(Expression::Literal(Literal::Int(v.wrapping_neg())));
                    }
                    Expression::Literal(Literal::Float(v)) => {
                        return Ok(Expression::Literal(Literal::Float(-v)));
                    }
                    _ => {
                        return Ok(Expression::Unary {
                            op,
                            operand: Box::new(operand),
                        });
                    }
                }
            }
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = self.expect_ident("after `.`")?;
                expr = Expression::Field {
                    object: Box::new(expr),
                    name,
                };
            } else if self.eat(&Token::LParen) {
                let args = self.parse_args()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "to close the argument list")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.advance() {
            Some((Token::Int(v), _)) => Ok(Expression::Literal(Literal::Int(v))),
            Some((Token::Float(v), _)) => Ok(Expression::Literal(Literal::Float(v))),
            Some((Token::Str(s), _)) => Ok(Expression::Literal(Literal::Str(s))),
            Some((Token::True, _)) => Ok(Expression::Literal(Literal::Bool(true))),
            Some((Token::False, _)) => Ok(Expression::Literal(Literal::Bool(false))),
            Some((Token::Null, _)) => Ok(Expression::Literal(Literal::Null)),
            Some((Token::This, _)) => Ok(Expression::This),
            Some((Token::Ident(name), _)) => Ok(Expression::Ident(name)),
            Some((Token::New, _)) => {
                let class = self.parse_qualified_name("after `new`")?;
                self.expect(Token::LParen, "after the constructed class name")?;
                let args = self.parse_args()?;
                Ok(Expression::New { class, args })
            }
            Some((Token::LParen, _)) => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen, "to close the parenthesized expression")?;
                Ok(expr)
            }
            Some((found, span)) => Err(ParseError::unexpected_token(
                "an expression",
                found,
                span,
            )),
            None => Err(ParseError::unexpected_eof(
                "an expression",
                self.peek_span(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
@Json(indent = 4)
public class Counter extends demo.Base implements demo.Countable {
    private static count: int = 0;
    tags: demo.TagList;

    public function increment(step: int): int {
        count = count + step;
        return count;
    }

    abstract function reset();
}
"#;

    #[test]
    fn test_parse_class_shape() {
        let program = parse(COUNTER).unwrap();
        assert_eq!(program.classes.len(), 1);

        let class = &program.classes[0];
        assert_eq!(class.name, "Counter");
        assert_eq!(class.superclass.as_deref(), Some("demo.Base"));
        assert_eq!(class.interfaces, vec!["demo.Countable".to_string()]);
        assert_eq!(class.modifiers, vec![Modifier::Public]);
        assert_eq!(class.annotations.len(), 1);
        assert_eq!(class.annotations[0].name, "Json");
        assert_eq!(
            class.annotations[0].values,
            vec![("indent".to_string(), Literal::Int(4))]
        );
        assert_eq!(class.members.len(), 4);
    }

    #[test]
    fn test_parse_field() {
        let program = parse(COUNTER).unwrap();
        let Member::Field(field) = &program.classes[0].members[0] else {
            panic!("expected field");
        };
        assert_eq!(field.name, "count");
        assert_eq!(
            field.modifiers,
            vec![Modifier::Private, Modifier::Static]
        );
        assert_eq!(field.ty, TypeAnnotation::Named("int".to_string()));
        assert_eq!(field.initializer, Some(Literal::Int(0)));
    }

    #[test]
    fn test_parse_method() {
        let program = parse(COUNTER).unwrap();
        let Member::Method(method) = &program.classes[0].members[2] else {
            panic!("expected method");
        };
        assert_eq!(method.name, "increment");
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.params[0].name, "step");
        assert_eq!(
            method.return_type,
            Some(TypeAnnotation::Named("int".to_string()))
        );
        let body = method.body.as_ref().unwrap();
        assert_eq!(body.len(), 2);
        assert!(matches!(body[1], Statement::Return(Some(_))));
    }

    #[test]
    fn test_parse_abstract_method() {
        let program = parse(COUNTER).unwrap();
        let Member::Method(method) = &program.classes[0].members[3] else {
            panic!("expected method");
        };
        assert_eq!(method.name, "reset");
        assert!(method.body.is_none());
        assert!(method.return_type.is_none());
    }

    #[test]
    fn test_precedence() {
        let program = parse(
            "class T { function f(): int { return 1 + 2 * 3; } }",
        )
        .unwrap();
        let Member::Method(method) = &program.classes[0].members[0] else {
            panic!("expected method");
        };
        let Some(Statement::Return(Some(Expression::Binary { op, rhs, .. }))) =
            method.body.as_ref().unwrap().first()
        else {
            panic!("expected return of a binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            **rhs,
            Expression::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_array_types() {
        let program = parse("class T { xs: int[][]; }").unwrap();
        let Member::Field(field) = &program.classes[0].members[0] else {
            panic!("expected field");
        };
        assert_eq!(
            field.ty,
            TypeAnnotation::Array(Box::new(TypeAnnotation::Array(Box::new(
                TypeAnnotation::Named("int".to_string())
            ))))
        );
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("class T { x: int }").unwrap_err();
        assert!(err.to_string().contains("`;`"));
    }

    #[test]
    fn test_non_literal_initializer_rejected() {
        assert!(parse("class T { x: int = y; }").is_err());
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("class T { function f() { 1 = 2; } }").unwrap_err();
        assert!(err.message.contains("assignment target"));
    }
}
