//! Compiled class-file format
//!
//! A `.opc` file holds a single class definition: header, constant pool,
//! class table (fields, methods, annotations) and trailing metadata. All
//! names and descriptors inside the class table are constant-pool indices.

use crate::constants::ConstantPool;
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use thiserror::Error;

/// Magic number for Opal class files: "OPAL"
pub const MAGIC: [u8; 4] = *b"OPAL";

/// Current class-file version
pub const VERSION: u32 = 1;

/// Class-file encoding/decoding errors
#[derive(Debug, Error)]
pub enum ClassFileError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected OPAL, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported class-file version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum stored in the header
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },

    /// Constant-pool index out of range
    #[error("Invalid constant pool reference: string index {0}")]
    InvalidPoolIndex(u32),

    /// Unknown tag byte in an encoded constant value
    #[error("Invalid constant value tag {tag:#x} at offset {offset}")]
    InvalidConstTag {
        /// The unrecognized tag byte
        tag: u8,
        /// Offset of the tag in the input
        offset: usize,
    },
}

/// Access flags for classes, fields and methods
pub mod access {
    /// Visible everywhere
    pub const PUBLIC: u32 = 0x0001;
    /// Visible only in the declaring class
    pub const PRIVATE: u32 = 0x0002;
    /// Visible in the declaring class and subclasses
    pub const PROTECTED: u32 = 0x0004;
    /// Class member, not instance member
    pub const STATIC: u32 = 0x0008;
    /// Not overridable / not reassignable
    pub const FINAL: u32 = 0x0010;
    /// Interface class
    pub const INTERFACE: u32 = 0x0200;
    /// Abstract class or bodiless method
    pub const ABSTRACT: u32 = 0x0400;
    /// Compiler-generated, absent from source
    pub const SYNTHETIC: u32 = 0x1000;
    /// Annotation class
    pub const ANNOTATION: u32 = 0x2000;
}

/// Class-file flags
pub mod flags {
    /// File carries debug information (parameter names, source file)
    pub const HAS_DEBUG_INFO: u32 = 1 << 0;
}

/// A scalar constant stored in the class table
///
/// Strings are pool references; numbers are inlined.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// Boolean constant
    Bool(bool),
    /// Integer constant
    Int(i64),
    /// Float constant
    Float(f64),
    /// String constant (pool index)
    Str(u32),
    /// Null reference constant
    Null,
}

impl ConstValue {
    fn encode(&self, writer: &mut BytecodeWriter) {
        match self {
            ConstValue::Bool(b) => {
                writer.emit_u8(0);
                writer.emit_u8(u8::from(*b));
            }
            ConstValue::Int(i) => {
                writer.emit_u8(1);
                writer.emit_i64(*i);
            }
            ConstValue::Float(f) => {
                writer.emit_u8(2);
                writer.emit_f64(*f);
            }
            ConstValue::Str(index) => {
                writer.emit_u8(3);
                writer.emit_u32(*index);
            }
            ConstValue::Null => writer.emit_u8(4),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let offset = reader.position();
        let tag = reader.read_u8()?;
        Ok(match tag {
            0 => ConstValue::Bool(reader.read_u8()? != 0),
            1 => ConstValue::Int(reader.read_i64()?),
            2 => ConstValue::Float(reader.read_f64()?),
            3 => ConstValue::Str(reader.read_u32()?),
            4 => ConstValue::Null,
            _ => return Err(ClassFileError::InvalidConstTag { tag, offset }),
        })
    }
}

/// Annotation attached to a class, field or method
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDef {
    /// Annotation type descriptor (pool index, e.g. `Ldemo/Json;`)
    pub type_desc: u32,
    /// Named values, in declaration order (name pool index, value)
    pub values: Vec<(u32, ConstValue)>,
}

impl AnnotationDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.type_desc);
        writer.emit_u32(self.values.len() as u32);
        for (name, value) in &self.values {
            writer.emit_u32(*name);
            value.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let type_desc = reader.read_u32()?;
        let value_count = reader.read_u32()? as usize;
        let mut values = Vec::with_capacity(value_count);
        for _ in 0..value_count {
            let name = reader.read_u32()?;
            values.push((name, ConstValue::decode(reader)?));
        }
        Ok(Self { type_desc, values })
    }
}

fn encode_annotations(annotations: &[AnnotationDef], writer: &mut BytecodeWriter) {
    writer.emit_u32(annotations.len() as u32);
    for annotation in annotations {
        annotation.encode(writer);
    }
}

fn decode_annotations(reader: &mut BytecodeReader<'_>) -> Result<Vec<AnnotationDef>, ClassFileError> {
    let count = reader.read_u32()? as usize;
    let mut annotations = Vec::with_capacity(count);
    for _ in 0..count {
        annotations.push(AnnotationDef::decode(reader)?);
    }
    Ok(annotations)
}

/// Executable content of a method
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttr {
    /// Maximum operand stack depth, derived from the instruction stream
    pub max_stack: u16,
    /// Number of local variable slots (parameters included)
    pub max_locals: u16,
    /// Bytecode instructions
    pub code: Vec<u8>,
}

impl CodeAttr {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u16(self.max_stack);
        writer.emit_u16(self.max_locals);
        writer.emit_u32(self.code.len() as u32);
        writer.buffer.extend_from_slice(&self.code);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let max_stack = reader.read_u16()?;
        let max_locals = reader.read_u16()?;
        let code_len = reader.read_u32()? as usize;
        let code = reader.read_bytes(code_len)?;
        Ok(Self {
            max_stack,
            max_locals,
            code,
        })
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name (pool index)
    pub name: u32,
    /// Type descriptor (pool index, e.g. `I`)
    pub descriptor: u32,
    /// Access flags
    pub flags: u32,
    /// Annotations
    pub annotations: Vec<AnnotationDef>,
    /// Constant initializer, if any
    pub constant: Option<ConstValue>,
}

impl FieldDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.name);
        writer.emit_u32(self.descriptor);
        writer.emit_u32(self.flags);
        encode_annotations(&self.annotations, writer);
        match &self.constant {
            Some(value) => {
                writer.emit_u8(1);
                value.encode(writer);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let name = reader.read_u32()?;
        let descriptor = reader.read_u32()?;
        let flags = reader.read_u32()?;
        let annotations = decode_annotations(reader)?;
        let constant = if reader.read_u8()? != 0 {
            Some(ConstValue::decode(reader)?)
        } else {
            None
        };
        Ok(Self {
            name,
            descriptor,
            flags,
            annotations,
            constant,
        })
    }
}

/// Method definition
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Method name (pool index)
    pub name: u32,
    /// Method descriptor (pool index, e.g. `(I)V`)
    pub descriptor: u32,
    /// Access flags
    pub flags: u32,
    /// Annotations
    pub annotations: Vec<AnnotationDef>,
    /// Parameter names (pool indices, debug information)
    pub param_names: Vec<u32>,
    /// Code attribute; absent for abstract methods
    pub code: Option<CodeAttr>,
}

impl MethodDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.name);
        writer.emit_u32(self.descriptor);
        writer.emit_u32(self.flags);
        encode_annotations(&self.annotations, writer);
        writer.emit_u32(self.param_names.len() as u32);
        for name in &self.param_names {
            writer.emit_u32(*name);
        }
        match &self.code {
            Some(code) => {
                writer.emit_u8(1);
                code.encode(writer);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let name = reader.read_u32()?;
        let descriptor = reader.read_u32()?;
        let flags = reader.read_u32()?;
        let annotations = decode_annotations(reader)?;
        let param_count = reader.read_u32()? as usize;
        let mut param_names = Vec::with_capacity(param_count);
        for _ in 0..param_count {
            param_names.push(reader.read_u32()?);
        }
        let code = if reader.read_u8()? != 0 {
            Some(CodeAttr::decode(reader)?)
        } else {
            None
        };
        Ok(Self {
            name,
            descriptor,
            flags,
            annotations,
            param_names,
            code,
        })
    }
}

/// Class definition
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name (pool index, internal form `demo/Counter`)
    pub name: u32,
    /// Superclass name (pool index), if any
    pub super_name: Option<u32>,
    /// Implemented interface names (pool indices)
    pub interfaces: Vec<u32>,
    /// Access flags
    pub flags: u32,
    /// Annotations
    pub annotations: Vec<AnnotationDef>,
    /// Fields, in declaration order
    pub fields: Vec<FieldDef>,
    /// Methods, in declaration order
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.name);
        match self.super_name {
            Some(index) => {
                writer.emit_u8(1);
                writer.emit_u32(index);
            }
            None => writer.emit_u8(0),
        }
        writer.emit_u32(self.interfaces.len() as u32);
        for index in &self.interfaces {
            writer.emit_u32(*index);
        }
        writer.emit_u32(self.flags);
        encode_annotations(&self.annotations, writer);

        writer.emit_u32(self.fields.len() as u32);
        for field in &self.fields {
            field.encode(writer);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let name = reader.read_u32()?;
        let super_name = if reader.read_u8()? != 0 {
            Some(reader.read_u32()?)
        } else {
            None
        };
        let interface_count = reader.read_u32()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(reader.read_u32()?);
        }
        let flags = reader.read_u32()?;
        let annotations = decode_annotations(reader)?;

        let field_count = reader.read_u32()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(FieldDef::decode(reader)?);
        }

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(MethodDef::decode(reader)?);
        }

        Ok(Self {
            name,
            super_name,
            interfaces,
            flags,
            annotations,
            fields,
            methods,
        })
    }
}

/// Class-file metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Source file path
    pub source_file: Option<String>,
}

impl Metadata {
    fn encode(&self, writer: &mut BytecodeWriter) {
        match &self.source_file {
            Some(path) => {
                writer.emit_u8(1);
                writer.emit_string(path);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ClassFileError> {
        let source_file = if reader.read_u8()? != 0 {
            Some(reader.read_string()?)
        } else {
            None
        };
        Ok(Self { source_file })
    }
}

/// A compiled Opal class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Magic number (must be "OPAL")
    pub magic: [u8; 4],
    /// Class-file version
    pub version: u32,
    /// File flags
    pub flags: u32,
    /// Constant pool
    pub constants: ConstantPool,
    /// The class definition
    pub class: ClassDef,
    /// Trailing metadata
    pub metadata: Metadata,
}

impl ClassFile {
    /// Create a new class file for the given internal class name
    pub fn new(class_name: &str) -> Self {
        let mut constants = ConstantPool::new();
        let name = constants.add_string(class_name);
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            constants,
            class: ClassDef {
                name,
                super_name: None,
                interfaces: Vec::new(),
                flags: 0,
                annotations: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
            metadata: Metadata::default(),
        }
    }

    /// Resolve the class name from the pool
    pub fn class_name(&self) -> Result<&str, ClassFileError> {
        self.constants
            .get_string(self.class.name)
            .ok_or(ClassFileError::InvalidPoolIndex(self.class.name))
    }

    /// Validate header fields and pool references in the class table
    pub fn validate(&self) -> Result<(), ClassFileError> {
        if self.magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(self.magic));
        }
        if self.version != VERSION {
            return Err(ClassFileError::UnsupportedVersion(self.version));
        }

        let check = |index: u32| {
            if self.constants.get_string(index).is_none() {
                Err(ClassFileError::InvalidPoolIndex(index))
            } else {
                Ok(())
            }
        };

        check(self.class.name)?;
        if let Some(index) = self.class.super_name {
            check(index)?;
        }
        for &index in &self.class.interfaces {
            check(index)?;
        }
        for annotation in &self.class.annotations {
            check(annotation.type_desc)?;
        }
        for field in &self.class.fields {
            check(field.name)?;
            check(field.descriptor)?;
            for annotation in &field.annotations {
                check(annotation.type_desc)?;
            }
        }
        for method in &self.class.methods {
            check(method.name)?;
            check(method.descriptor)?;
            for &index in &method.param_names {
                check(index)?;
            }
            for annotation in &method.annotations {
                check(annotation.type_desc)?;
            }
        }
        Ok(())
    }

    /// Encode the class file to binary format (.opc)
    ///
    /// Format:
    /// - Header: magic (4 bytes) + version (u32) + flags (u32) + checksum (u32)
    /// - Constant pool
    /// - Class table
    /// - Metadata
    ///
    /// The checksum is the CRC-32 of everything after the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();

        let header_start = writer.offset();
        writer.buffer.extend_from_slice(&self.magic);
        writer.emit_u32(self.version);
        writer.emit_u32(self.flags);
        let checksum_offset = writer.offset();
        writer.emit_u32(0); // Placeholder for checksum

        self.constants.encode(&mut writer);
        self.class.encode(&mut writer);
        self.metadata.encode(&mut writer);

        let payload = &writer.buffer[header_start + 16..];
        let checksum = crc32fast::hash(payload);
        writer.patch_u32(checksum_offset, checksum);

        writer.into_bytes()
    }

    /// Decode a class file from binary format
    pub fn decode(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = BytecodeReader::new(data);

        let magic_bytes = reader.read_bytes(4)?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&magic_bytes);
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ClassFileError::UnsupportedVersion(version));
        }

        let flags = reader.read_u32()?;
        let stored_checksum = reader.read_u32()?;

        let payload = &data[16..];
        let calculated_checksum = crc32fast::hash(payload);
        if stored_checksum != calculated_checksum {
            return Err(ClassFileError::ChecksumMismatch {
                expected: stored_checksum,
                actual: calculated_checksum,
            });
        }

        let constants = ConstantPool::decode(&mut reader)?;
        let class = ClassDef::decode(&mut reader)?;
        let metadata = Metadata::decode(&mut reader)?;

        let file = Self {
            magic,
            version,
            flags,
            constants,
            class,
            metadata,
        };
        file.validate()?;
        Ok(file)
    }
}
