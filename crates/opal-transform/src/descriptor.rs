//! Canonical descriptors
//!
//! Descriptors are the engine's common vocabulary: every type and method
//! signature is canonicalized into these value types regardless of which
//! representation it came from. The canonical text form is the compiled
//! syntax (`I`, `[J`, `Ldemo/Counter;`, `(I)V`); the source syntax (`int`,
//! `long[]`, `demo.Counter`) converts to and from it.
//!
//! Values are immutable; edits replace a descriptor, never patch one.

use crate::error::TransformError;
use std::fmt;

fn malformed(descriptor: &str, reason: impl Into<String>) -> TransformError {
    TransformError::MalformedDescriptor {
        descriptor: descriptor.to_string(),
        reason: reason.into(),
    }
}

/// A canonical type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// `V`
    Void,
    /// `Z`
    Bool,
    /// `B`
    Byte,
    /// `S`
    Short,
    /// `C`
    Char,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `L<name>;` — a class reference, stored as a dotted name
    Object(String),
    /// `[<element>`
    Array(Box<TypeDesc>),
}

impl TypeDesc {
    /// Parse a complete compiled-syntax type descriptor
    pub fn parse(input: &str) -> Result<Self, TransformError> {
        let mut cursor = Cursor::new(input);
        let ty = cursor.parse_type()?;
        if !cursor.at_end() {
            return Err(malformed(input, "trailing characters after the type"));
        }
        Ok(ty)
    }

    /// Parse a source-syntax type name (`int`, `demo.Counter`, `long[][]`)
    pub fn from_source_name(input: &str) -> Result<Self, TransformError> {
        let mut base = input.trim();
        let mut dimensions = 0usize;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dimensions += 1;
        }

        let mut ty = match base {
            "void" => TypeDesc::Void,
            "bool" => TypeDesc::Bool,
            "byte" => TypeDesc::Byte,
            "short" => TypeDesc::Short,
            "char" => TypeDesc::Char,
            "int" => TypeDesc::Int,
            "long" => TypeDesc::Long,
            "float" => TypeDesc::Float,
            "double" => TypeDesc::Double,
            "" => return Err(malformed(input, "empty type name")),
            name => {
                let valid = name
                    .split('.')
                    .all(|part| {
                        !part.is_empty()
                            && part
                                .chars()
                                .all(|c| c.is_ascii_alphanumeric() || c == '_')
                    });
                if !valid {
                    return Err(malformed(input, "invalid class name"));
                }
                TypeDesc::Object(name.to_string())
            }
        };

        if ty == TypeDesc::Void && dimensions > 0 {
            return Err(malformed(input, "array of void"));
        }
        for _ in 0..dimensions {
            ty = TypeDesc::Array(Box::new(ty));
        }
        Ok(ty)
    }

    /// Render the compiled-syntax descriptor
    pub fn descriptor(&self) -> String {
        match self {
            TypeDesc::Void => "V".to_string(),
            TypeDesc::Bool => "Z".to_string(),
            TypeDesc::Byte => "B".to_string(),
            TypeDesc::Short => "S".to_string(),
            TypeDesc::Char => "C".to_string(),
            TypeDesc::Int => "I".to_string(),
            TypeDesc::Long => "J".to_string(),
            TypeDesc::Float => "F".to_string(),
            TypeDesc::Double => "D".to_string(),
            TypeDesc::Object(name) => format!("L{};", name.replace('.', "/")),
            TypeDesc::Array(elem) => format!("[{}", elem.descriptor()),
        }
    }

    /// Render the source-syntax name
    pub fn source_name(&self) -> String {
        match self {
            TypeDesc::Void => "void".to_string(),
            TypeDesc::Bool => "bool".to_string(),
            TypeDesc::Byte => "byte".to_string(),
            TypeDesc::Short => "short".to_string(),
            TypeDesc::Char => "char".to_string(),
            TypeDesc::Int => "int".to_string(),
            TypeDesc::Long => "long".to_string(),
            TypeDesc::Float => "float".to_string(),
            TypeDesc::Double => "double".to_string(),
            TypeDesc::Object(name) => name.clone(),
            TypeDesc::Array(elem) => format!("{}[]", elem.source_name()),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_name())
    }
}

/// A canonical method descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDesc {
    /// Parameter types, in order
    pub params: Vec<TypeDesc>,
    /// Return type
    pub ret: TypeDesc,
}

impl MethodDesc {
    /// Parse a complete compiled-syntax method descriptor, e.g. `(I)V`
    pub fn parse(input: &str) -> Result<Self, TransformError> {
        let mut cursor = Cursor::new(input);
        let desc = cursor.parse_method()?;
        if !cursor.at_end() {
            return Err(malformed(input, "trailing characters after the return type"));
        }
        Ok(desc)
    }

    /// Render the compiled-syntax descriptor
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            out.push_str(&param.descriptor());
        }
        out.push(')');
        out.push_str(&self.ret.descriptor());
        out
    }
}

impl fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A type or method descriptor — the unit of matching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// A field or variable type
    Type(TypeDesc),
    /// A method signature
    Method(MethodDesc),
}

impl Descriptor {
    /// Parse either descriptor form, detected by the leading delimiter
    pub fn parse(input: &str) -> Result<Self, TransformError> {
        if input.starts_with('(') {
            MethodDesc::parse(input).map(Descriptor::Method)
        } else {
            TypeDesc::parse(input).map(Descriptor::Type)
        }
    }

    /// Render the compiled-syntax descriptor
    pub fn descriptor(&self) -> String {
        match self {
            Descriptor::Type(ty) => ty.descriptor(),
            Descriptor::Method(method) => method.descriptor(),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Type(ty) => write!(f, "{ty}"),
            Descriptor::Method(method) => write!(f, "{method}"),
        }
    }
}

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn parse_type(&mut self) -> Result<TypeDesc, TransformError> {
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Err(malformed(self.input, "truncated descriptor"));
        };
        self.pos += 1;
        Ok(match byte {
            b'V' => TypeDesc::Void,
            b'Z' => TypeDesc::Bool,
            b'B' => TypeDesc::Byte,
            b'S' => TypeDesc::Short,
            b'C' => TypeDesc::Char,
            b'I' => TypeDesc::Int,
            b'J' => TypeDesc::Long,
            b'F' => TypeDesc::Float,
            b'D' => TypeDesc::Double,
            b'[' => {
                let elem = self.parse_type()?;
                if elem == TypeDesc::Void {
                    return Err(malformed(self.input, "array of void"));
                }
                TypeDesc::Array(Box::new(elem))
            }
            b'L' => {
                let start = self.pos;
                let Some(end) = self.input[start..].find(';').map(|i| start + i) else {
                    return Err(malformed(self.input, "missing `;` after class name"));
                };
                let name = &self.input[start..end];
                if name.is_empty() {
                    return Err(malformed(self.input, "empty class name"));
                }
                self.pos = end + 1;
                TypeDesc::Object(name.replace('/', "."))
            }
            other => {
                return Err(malformed(
                    self.input,
                    format!("unknown type prefix `{}`", other as char),
                ));
            }
        })
    }

    fn parse_method(&mut self) -> Result<MethodDesc, TransformError> {
        if self.bytes.first() != Some(&b'(') {
            return Err(malformed(self.input, "missing `(` to open the parameter list"));
        }
        self.pos = 1;

        let mut params = Vec::new();
        loop {
            match self.bytes.get(self.pos) {
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let param = self.parse_type()?;
                    if param == TypeDesc::Void {
                        return Err(malformed(self.input, "void parameter type"));
                    }
                    params.push(param);
                }
                None => {
                    return Err(malformed(
                        self.input,
                        "missing `)` to close the parameter list",
                    ));
                }
            }
        }

        let ret = self.parse_type()?;
        Ok(MethodDesc { params, ret })
    }
}
