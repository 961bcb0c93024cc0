//! AST nodes for the Opal language
//!
//! Declarations carry the span of their first token for diagnostics;
//! structural comparisons ignore spans (`Program::structurally_equals`), so
//! two parses of differently formatted but equivalent source compare equal.

use crate::token::Span;
use serde::Serialize;

/// A parsed compilation unit: a sequence of class declarations
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    /// Top-level class declarations, in source order
    pub classes: Vec<ClassDecl>,
}

impl Program {
    /// Compare two programs node-for-node, ignoring source positions
    pub fn structurally_equals(&self, other: &Self) -> bool {
        self.classes.len() == other.classes.len()
            && self
                .classes
                .iter()
                .zip(&other.classes)
                .all(|(a, b)| a.structurally_equals(b))
    }

    /// Serialize the tree to JSON for tooling output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A class declaration
#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    /// Annotations, in source order
    pub annotations: Vec<Annotation>,
    /// Modifier keywords, in source order
    pub modifiers: Vec<Modifier>,
    /// Simple class name
    pub name: String,
    /// Superclass (dotted), if any
    pub superclass: Option<String>,
    /// Implemented interfaces (dotted), in source order
    pub interfaces: Vec<String>,
    /// Fields and methods, in source order
    pub members: Vec<Member>,
    /// Span of the `class` keyword
    #[serde(skip)]
    pub span: Span,
}

impl ClassDecl {
    /// Compare two class declarations, ignoring source positions
    pub fn structurally_equals(&self, other: &Self) -> bool {
        self.annotations == other.annotations
            && self.modifiers == other.modifiers
            && self.name == other.name
            && self.superclass == other.superclass
            && self.interfaces == other.interfaces
            && self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.structurally_equals(b))
    }
}

/// A class member
#[derive(Debug, Clone, Serialize)]
pub enum Member {
    /// A field declaration
    Field(FieldDecl),
    /// A method declaration
    Method(MethodDecl),
}

impl Member {
    /// Compare two members, ignoring source positions
    pub fn structurally_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Member::Field(a), Member::Field(b)) => a.structurally_equals(b),
            (Member::Method(a), Member::Method(b)) => a.structurally_equals(b),
            _ => false,
        }
    }
}

/// A field declaration: `name: type = literal;`
#[derive(Debug, Clone, Serialize)]
pub struct FieldDecl {
    /// Annotations, in source order
    pub annotations: Vec<Annotation>,
    /// Modifier keywords, in source order
    pub modifiers: Vec<Modifier>,
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeAnnotation,
    /// Constant initializer, if any (restricted to literals)
    pub initializer: Option<Literal>,
    /// Span of the field name
    #[serde(skip)]
    pub span: Span,
}

impl FieldDecl {
    fn structurally_equals(&self, other: &Self) -> bool {
        self.annotations == other.annotations
            && self.modifiers == other.modifiers
            && self.name == other.name
            && self.ty == other.ty
            && self.initializer == other.initializer
    }
}

/// A method declaration
#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    /// Annotations, in source order
    pub annotations: Vec<Annotation>,
    /// Modifier keywords, in source order
    pub modifiers: Vec<Modifier>,
    /// Method name
    pub name: String,
    /// Parameters, in source order
    pub params: Vec<Param>,
    /// Return type; `None` means void
    pub return_type: Option<TypeAnnotation>,
    /// Statement body; `None` for bodiless (abstract) methods
    pub body: Option<Vec<Statement>>,
    /// Span of the `function` keyword
    #[serde(skip)]
    pub span: Span,
}

impl MethodDecl {
    fn structurally_equals(&self, other: &Self) -> bool {
        self.annotations == other.annotations
            && self.modifiers == other.modifiers
            && self.name == other.name
            && self.params == other.params
            && self.return_type == other.return_type
            && self.body == other.body
    }
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: TypeAnnotation,
}

/// Modifier keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modifier {
    /// `public`
    Public,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `static`
    Static,
    /// `final`
    Final,
    /// `abstract`
    Abstract,
}

impl Modifier {
    /// The source keyword for this modifier
    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Abstract => "abstract",
        }
    }
}

/// A type annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeAnnotation {
    /// Primitive or (possibly qualified) class type, as written
    Named(String),
    /// Array type
    Array(Box<TypeAnnotation>),
}

impl TypeAnnotation {
    /// Render the annotation as source text
    pub fn render(&self) -> String {
        match self {
            TypeAnnotation::Named(name) => name.clone(),
            TypeAnnotation::Array(elem) => format!("{}[]", elem.render()),
        }
    }
}

/// An annotation: `@Name` or `@Name(key = literal, ...)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// Annotation type name (dotted)
    pub name: String,
    /// Named values, in source order
    pub values: Vec<(String, Literal)>,
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(String),
}

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    /// `let name: type = expr;`
    Let {
        /// Variable name
        name: String,
        /// Optional type annotation
        ty: Option<TypeAnnotation>,
        /// Initializer
        init: Expression,
    },
    /// An expression evaluated for effect
    Expression(Expression),
    /// `return expr?;`
    Return(Option<Expression>),
    /// `if (cond) { ... } else { ... }`
    If {
        /// Condition
        condition: Expression,
        /// Then branch
        then_block: Vec<Statement>,
        /// Else branch, if present
        else_block: Option<Vec<Statement>>,
    },
    /// `while (cond) { ... }`
    While {
        /// Condition
        condition: Expression,
        /// Loop body
        body: Vec<Statement>,
    },
}

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    /// A literal
    Literal(Literal),
    /// A bare identifier
    Ident(String),
    /// `this`
    This,
    /// Member access: `object.name`
    Field {
        /// Receiver expression
        object: Box<Expression>,
        /// Member name
        name: String,
    },
    /// A call: `callee(args...)`
    Call {
        /// Called expression (identifier or member access)
        callee: Box<Expression>,
        /// Arguments, in order
        args: Vec<Expression>,
    },
    /// Construction: `new Class(args...)`
    New {
        /// Constructed class (dotted)
        class: String,
        /// Arguments, in order
        args: Vec<Expression>,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expression>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expression>,
        /// Right operand
        rhs: Box<Expression>,
    },
    /// Assignment: `target = value`
    Assign {
        /// Assignment target (identifier or member access)
        target: Box<Expression>,
        /// Assigned value
        value: Box<Expression>,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

impl UnaryOp {
    /// The operator's source symbol
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// The operator's source symbol
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    #[test]
    fn test_to_json_shape() {
        let program = parse("class T { x: int = 1; }").unwrap();
        let json = program.to_json();
        assert_eq!(json["classes"][0]["name"], "T");
        assert!(json["classes"][0]["members"][0]["Field"]["initializer"].is_object());
    }

    #[test]
    fn test_structural_equality_ignores_formatting() {
        let a = parse("class T { x: int; }").unwrap();
        let b = parse("class T {\n    x: int;\n}\n").unwrap();
        assert!(a.structurally_equals(&b));

        let c = parse("class T { x: long; }").unwrap();
        assert!(!a.structurally_equals(&c));
    }
}
