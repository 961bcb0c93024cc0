//! Opal VM Class-File Definitions
//!
//! This crate provides the compiled class-file format for the Opal virtual
//! machine: the constant pool, class/field/method tables, the bytecode
//! instruction set, and encoding/decoding plus structural verification.
//!
//! A `.opc` file holds exactly one class definition together with its own
//! constant pool. All names, descriptors and string operands inside the class
//! table are `u32` indices into that pool.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod classfile;
pub mod constants;
pub mod encoder;
pub mod opcode;
pub mod verify;

pub use classfile::{
    access, AnnotationDef, ClassDef, ClassFile, ClassFileError, CodeAttr, ConstValue, FieldDef,
    Metadata, MethodDef,
};
pub use constants::ConstantPool;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use opcode::Opcode;
pub use verify::{compute_max_stack, verify_class, VerifyError};
