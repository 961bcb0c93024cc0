//! Bytecode encoding and decoding utilities
//!
//! This module provides tools for encoding and decoding Opal bytecode
//! instructions and the surrounding class-file tables.

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors that can occur during bytecode decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Unexpected end of bytecode stream
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// Invalid opcode
    #[error("Invalid opcode {0:#x} at offset {1}")]
    InvalidOpcode(u8, usize),
}

/// Bytecode writer for encoding instructions and tables
///
/// Provides methods for emitting opcodes and their operands into a binary
/// buffer, little-endian.
pub struct BytecodeWriter {
    /// Internal buffer containing the bytecode
    pub(crate) buffer: Vec<u8>,
}

impl BytecodeWriter {
    /// Create a new bytecode writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new bytecode writer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current bytecode buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the bytecode buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of bytecode)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    // ===== Basic Emission =====

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer (little-endian)
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit unsigned integer (little-endian)
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit signed integer (little-endian)
    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 64-bit signed integer (little-endian)
    pub fn emit_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 64-bit float (little-endian)
    pub fn emit_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a length-prefixed UTF-8 string
    pub fn emit_string(&mut self, value: &str) {
        self.emit_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Patch a previously emitted u32 at the given offset
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    // ===== Opcode Emission =====

    /// Emit an opcode without operands
    pub fn emit_opcode(&mut self, opcode: Opcode) {
        self.emit_u8(opcode.to_u8());
    }

    /// Emit POP instruction
    pub fn emit_pop(&mut self) {
        self.emit_opcode(Opcode::Pop);
    }

    /// Emit CONST_NULL instruction
    pub fn emit_const_null(&mut self) {
        self.emit_opcode(Opcode::ConstNull);
    }

    /// Emit CONST_TRUE instruction
    pub fn emit_const_true(&mut self) {
        self.emit_opcode(Opcode::ConstTrue);
    }

    /// Emit CONST_FALSE instruction
    pub fn emit_const_false(&mut self) {
        self.emit_opcode(Opcode::ConstFalse);
    }

    /// Emit CONST_I32 instruction with value
    pub fn emit_const_i32(&mut self, value: i32) {
        self.emit_opcode(Opcode::ConstI32);
        self.emit_i32(value);
    }

    /// Emit CONST_F64 instruction with value
    pub fn emit_const_f64(&mut self, value: f64) {
        self.emit_opcode(Opcode::ConstF64);
        self.emit_f64(value);
    }

    /// Emit CONST_STR instruction with constant pool index
    pub fn emit_const_str(&mut self, index: u32) {
        self.emit_opcode(Opcode::ConstStr);
        self.emit_u32(index);
    }

    /// Emit LOAD_LOCAL instruction
    pub fn emit_load_local(&mut self, index: u16) {
        self.emit_opcode(Opcode::LoadLocal);
        self.emit_u16(index);
    }

    /// Emit STORE_LOCAL instruction
    pub fn emit_store_local(&mut self, index: u16) {
        self.emit_opcode(Opcode::StoreLocal);
        self.emit_u16(index);
    }

    /// Emit IADD instruction
    pub fn emit_iadd(&mut self) {
        self.emit_opcode(Opcode::Iadd);
    }

    /// Emit JMP instruction with relative offset
    pub fn emit_jmp(&mut self, offset: i32) {
        self.emit_opcode(Opcode::Jmp);
        self.emit_i32(offset);
    }

    /// Emit JMP_IF_FALSE instruction with relative offset
    pub fn emit_jmp_if_false(&mut self, offset: i32) {
        self.emit_opcode(Opcode::JmpIfFalse);
        self.emit_i32(offset);
    }

    /// Emit RETURN instruction
    pub fn emit_return(&mut self) {
        self.emit_opcode(Opcode::Return);
    }

    /// Emit RETURN_VOID instruction
    pub fn emit_return_void(&mut self) {
        self.emit_opcode(Opcode::ReturnVoid);
    }

    /// Emit CALL instruction with symbol index and argument count
    pub fn emit_call(&mut self, symbol: u32, argc: u16) {
        self.emit_opcode(Opcode::Call);
        self.emit_u32(symbol);
        self.emit_u16(argc);
    }

    /// Emit CALL_STATIC instruction with symbol index and argument count
    pub fn emit_call_static(&mut self, symbol: u32, argc: u16) {
        self.emit_opcode(Opcode::CallStatic);
        self.emit_u32(symbol);
        self.emit_u16(argc);
    }

    /// Emit NEW instruction with class index and argument count
    pub fn emit_new(&mut self, class: u32, argc: u16) {
        self.emit_opcode(Opcode::New);
        self.emit_u32(class);
        self.emit_u16(argc);
    }

    /// Emit LOAD_FIELD instruction with symbol index
    pub fn emit_load_field(&mut self, symbol: u32) {
        self.emit_opcode(Opcode::LoadField);
        self.emit_u32(symbol);
    }

    /// Emit STORE_FIELD instruction with symbol index
    pub fn emit_store_field(&mut self, symbol: u32) {
        self.emit_opcode(Opcode::StoreField);
        self.emit_u32(symbol);
    }

    /// Emit LOAD_STATIC instruction with symbol index
    pub fn emit_load_static(&mut self, symbol: u32) {
        self.emit_opcode(Opcode::LoadStatic);
        self.emit_u32(symbol);
    }

    /// Emit STORE_STATIC instruction with symbol index
    pub fn emit_store_static(&mut self, symbol: u32) {
        self.emit_opcode(Opcode::StoreStatic);
        self.emit_u32(symbol);
    }

    /// Emit THROW instruction
    pub fn emit_throw(&mut self) {
        self.emit_opcode(Opcode::Throw);
    }
}

impl Default for BytecodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytecode reader for decoding instructions and tables
pub struct BytecodeReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Create a new reader over the given bytes
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current read position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check whether any bytes remain
    pub fn has_more(&self) -> bool {
        self.position < self.data.len()
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.position >= self.data.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let value = self.data[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Read a 16-bit unsigned integer (little-endian)
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_array::<2>()?;
        Ok(u16::from_le_bytes(bytes))
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a 32-bit signed integer (little-endian)
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(i32::from_le_bytes(bytes))
    }

    /// Read a 64-bit signed integer (little-endian)
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let bytes = self.read_array::<8>()?;
        Ok(i64::from_le_bytes(bytes))
    }

    /// Read a 64-bit float (little-endian)
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.read_array::<8>()?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read a fixed number of bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        if self.position + count > self.data.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = self.data[self.position..self.position + count].to_vec();
        self.position += count;
        Ok(bytes)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.position;
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8(start))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        if self.position + N > self.data.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_reader_roundtrip() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u8(0xAB);
        writer.emit_u16(0x1234);
        writer.emit_u32(0xDEADBEEF);
        writer.emit_i32(-42);
        writer.emit_f64(3.5);
        writer.emit_string("hello");

        let bytes = writer.into_bytes();
        let mut reader = BytecodeReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_i32().unwrap(), -42);
        assert_eq!(reader.read_f64().unwrap(), 3.5);
        assert_eq!(reader.read_string().unwrap(), "hello");
        assert!(!reader.has_more());
    }

    #[test]
    fn test_unexpected_end() {
        let bytes = [0x01u8];
        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert!(matches!(
            reader.read_u32(),
            Err(DecodeError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u32(2);
        writer.emit_u8(0xFF);
        writer.emit_u8(0xFE);

        let bytes = writer.into_bytes();
        let mut reader = BytecodeReader::new(&bytes);
        assert!(matches!(
            reader.read_string(),
            Err(DecodeError::InvalidUtf8(0))
        ));
    }

    #[test]
    fn test_patch_u32() {
        let mut writer = BytecodeWriter::new();
        let offset = writer.offset();
        writer.emit_u32(0);
        writer.emit_u8(0x7F);
        writer.patch_u32(offset, 0xCAFE);

        let bytes = writer.into_bytes();
        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(reader.read_u32().unwrap(), 0xCAFE);
        assert_eq!(reader.read_u8().unwrap(), 0x7F);
    }

    #[test]
    fn test_instruction_emission() {
        let mut writer = BytecodeWriter::new();
        writer.emit_const_i32(7);
        writer.emit_store_local(0);
        writer.emit_load_local(0);
        writer.emit_return();

        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], Opcode::ConstI32.to_u8());
        assert_eq!(bytes[5], Opcode::StoreLocal.to_u8());
        assert_eq!(bytes[8], Opcode::LoadLocal.to_u8());
        assert_eq!(bytes[11], Opcode::Return.to_u8());
    }
}
