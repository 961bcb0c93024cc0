//! The unified class model
//!
//! Both adapters load their native representation into this entity graph;
//! matchers and mutators operate only on it. A model and its members live for
//! one load-mutate-write cycle and are discarded afterwards.

use crate::descriptor::{MethodDesc, TypeDesc};
use opal_syntax::ast::Statement;
use std::fmt;

/// The representation family a model or body handle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Compiled binary class file
    Bytecode,
    /// Parsed source text
    Source,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Bytecode => write!(f, "bytecode"),
            Origin::Source => write!(f, "source"),
        }
    }
}

/// A scalar constant: field initializers and annotation values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null reference
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
}

/// An annotation entry on a class, field or method
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationModel {
    /// Annotation class type
    pub ty: TypeDesc,
    /// Named values, in declaration order
    pub values: Vec<(String, Value)>,
}

impl AnnotationModel {
    /// Create a value-less annotation of the given dotted type name
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            ty: TypeDesc::Object(name.into()),
            values: Vec::new(),
        }
    }
}

/// Representation-specific method body payload.
///
/// Only the owning adapter interprets this; the engine moves it around
/// opaquely inside [`BodyHandle`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BodyRepr {
    /// Bytecode instruction stream (max_stack is derived on write)
    Bytecode {
        /// Local variable slots, parameters included
        max_locals: u16,
        /// Encoded instructions
        code: Vec<u8>,
    },
    /// Source statement block
    Source(Vec<Statement>),
}

/// An opaque, representation-owned reference to a method's executable content
///
/// A handle is valid only for the adapter family that produced it; using it
/// against a model of a different origin is the checked error
/// [`crate::TransformError::ForeignBodyHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct BodyHandle {
    origin: Origin,
    pub(crate) repr: BodyRepr,
}

impl BodyHandle {
    pub(crate) fn new(origin: Origin, repr: BodyRepr) -> Self {
        Self { origin, repr }
    }

    /// The representation family that owns this body
    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// A method in the class model
#[derive(Debug, Clone, PartialEq)]
pub struct MethodModel {
    /// Method name
    pub name: String,
    /// Canonical signature
    pub descriptor: MethodDesc,
    /// Access flags (see [`opal_bytecode::access`])
    pub access: u32,
    /// Annotations, in declaration order
    pub annotations: Vec<AnnotationModel>,
    /// Parameter names; same arity as the descriptor's parameter list
    pub param_names: Vec<String>,
    /// Executable content; `None` for abstract methods
    pub body: Option<BodyHandle>,
    pub(crate) declaring: String,
}

impl MethodModel {
    /// Create a bodiless method with no flags or annotations
    pub fn new(name: impl Into<String>, descriptor: MethodDesc) -> Self {
        let name = name.into();
        let param_names = (0..descriptor.params.len())
            .map(|i| format!("arg{i}"))
            .collect();
        Self {
            name,
            descriptor,
            access: 0,
            annotations: Vec::new(),
            param_names,
            body: None,
            declaring: String::new(),
        }
    }

    /// Name of the class this method currently belongs to
    pub fn declaring_class(&self) -> &str {
        &self.declaring
    }
}

/// A field in the class model
#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    /// Field name
    pub name: String,
    /// Canonical type
    pub descriptor: TypeDesc,
    /// Access flags (see [`opal_bytecode::access`])
    pub access: u32,
    /// Annotations, in declaration order
    pub annotations: Vec<AnnotationModel>,
    /// Constant initializer, if any
    pub constant: Option<Value>,
    pub(crate) declaring: String,
}

impl FieldModel {
    /// Create a field with no flags, annotations or initializer
    pub fn new(name: impl Into<String>, descriptor: TypeDesc) -> Self {
        Self {
            name: name.into(),
            descriptor,
            access: 0,
            annotations: Vec::new(),
            constant: None,
            declaring: String::new(),
        }
    }

    /// Name of the class this field currently belongs to
    pub fn declaring_class(&self) -> &str {
        &self.declaring
    }
}

/// A class member: method or field
#[derive(Debug, Clone, PartialEq)]
pub enum MemberModel {
    /// A method
    Method(MethodModel),
    /// A field
    Field(FieldModel),
}

impl MemberModel {
    /// Member name
    pub fn name(&self) -> &str {
        match self {
            MemberModel::Method(m) => &m.name,
            MemberModel::Field(f) => &f.name,
        }
    }

    /// Compiled-syntax descriptor string
    pub fn descriptor_string(&self) -> String {
        match self {
            MemberModel::Method(m) => m.descriptor.descriptor(),
            MemberModel::Field(f) => f.descriptor.descriptor(),
        }
    }

    /// Access flags
    pub fn access(&self) -> u32 {
        match self {
            MemberModel::Method(m) => m.access,
            MemberModel::Field(f) => f.access,
        }
    }

    /// Replace the access flags wholesale
    pub fn set_access(&mut self, access: u32) {
        match self {
            MemberModel::Method(m) => m.access = access,
            MemberModel::Field(f) => f.access = access,
        }
    }

    /// Annotations, in declaration order
    pub fn annotations(&self) -> &[AnnotationModel] {
        match self {
            MemberModel::Method(m) => &m.annotations,
            MemberModel::Field(f) => &f.annotations,
        }
    }

    /// Replace the annotations wholesale
    pub fn set_annotations(&mut self, annotations: Vec<AnnotationModel>) {
        match self {
            MemberModel::Method(m) => m.annotations = annotations,
            MemberModel::Field(f) => f.annotations = annotations,
        }
    }

    /// Name of the class this member currently belongs to
    pub fn declaring_class(&self) -> &str {
        match self {
            MemberModel::Method(m) => &m.declaring,
            MemberModel::Field(f) => &f.declaring,
        }
    }

    pub(crate) fn set_declaring(&mut self, class: &str) {
        match self {
            MemberModel::Method(m) => m.declaring = class.to_string(),
            MemberModel::Field(f) => f.declaring = class.to_string(),
        }
    }

    /// The method variant, if this member is one
    pub fn as_method(&self) -> Option<&MethodModel> {
        match self {
            MemberModel::Method(m) => Some(m),
            MemberModel::Field(_) => None,
        }
    }

    /// The field variant, if this member is one
    pub fn as_field(&self) -> Option<&FieldModel> {
        match self {
            MemberModel::Field(f) => Some(f),
            MemberModel::Method(_) => None,
        }
    }

    /// A name + descriptor reference identifying this member
    pub fn reference(&self) -> MemberRef {
        MemberRef {
            name: self.name().to_string(),
            descriptor: self.descriptor_string(),
        }
    }
}

/// Identifies one member by name and compiled-syntax descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    /// Member name
    pub name: String,
    /// Compiled-syntax descriptor
    pub descriptor: String,
}

impl MemberRef {
    /// Create a reference from a name and descriptor string
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Check whether a member matches this reference
    pub fn matches(&self, member: &MemberModel) -> bool {
        member.name() == self.name && member.descriptor_string() == self.descriptor
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Methods read as `bar(I)V`, fields as `count:I`
        if self.descriptor.starts_with('(') {
            write!(f, "{}{}", self.name, self.descriptor)
        } else {
            write!(f, "{}:{}", self.name, self.descriptor)
        }
    }
}

/// The unified in-memory representation of one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassModel {
    origin: Origin,
    /// Dotted class name
    pub name: String,
    /// Dotted superclass name, if any
    pub superclass: Option<String>,
    /// Dotted interface names, in declaration order
    pub interfaces: Vec<String>,
    /// Access flags (see [`opal_bytecode::access`])
    pub access: u32,
    /// Annotations, in declaration order
    pub annotations: Vec<AnnotationModel>,
    /// Source file recorded in the representation's metadata, if any
    pub source_file: Option<String>,
    members: Vec<MemberModel>,
}

impl ClassModel {
    /// Create an empty class model owned by the given representation
    pub fn new(origin: Origin, name: impl Into<String>) -> Self {
        Self {
            origin,
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            access: 0,
            annotations: Vec::new(),
            source_file: None,
            members: Vec::new(),
        }
    }

    /// The representation family this model was loaded from
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Members in declaration order
    pub fn members(&self) -> &[MemberModel] {
        &self.members
    }

    /// Methods in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodModel> {
        self.members.iter().filter_map(MemberModel::as_method)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldModel> {
        self.members.iter().filter_map(MemberModel::as_field)
    }

    /// Append a member, claiming ownership of it
    pub fn push_member(&mut self, mut member: MemberModel) {
        member.set_declaring(&self.name);
        self.members.push(member);
    }

    /// Index of the member identified by `reference`, if present
    pub fn index_of(&self, reference: &MemberRef) -> Option<usize> {
        self.members.iter().position(|m| reference.matches(m))
    }

    /// The member identified by `reference`, if present
    pub fn find(&self, reference: &MemberRef) -> Option<&MemberModel> {
        self.members.iter().find(|m| reference.matches(m))
    }

    pub(crate) fn members_mut(&mut self) -> &mut Vec<MemberModel> {
        &mut self.members
    }
}
