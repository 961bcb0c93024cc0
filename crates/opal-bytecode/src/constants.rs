//! Constant pool for Opal class files
//!
//! All names, descriptors and string operands in a class file are indices
//! into its constant pool. Adding an entry that already exists returns the
//! existing index, so repeated interning yields consistent references.

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use rustc_hash::FxHashMap;

/// Interned constants referenced by index from the class table and bytecode
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// String pool (names, descriptors, string literals)
    pub strings: Vec<String>,
    /// Integer pool
    pub integers: Vec<i64>,
    /// Float pool
    pub floats: Vec<f64>,
    string_index: FxHashMap<String, u32>,
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        // The interner map is a lookup cache over `strings`
        self.strings == other.strings
            && self.integers == other.integers
            && self.floats == other.floats
    }
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its pool index
    pub fn add_string(&mut self, value: impl Into<String>) -> u32 {
        let value = value.into();
        if let Some(&index) = self.string_index.get(&value) {
            return index;
        }
        let index = self.strings.len() as u32;
        self.string_index.insert(value.clone(), index);
        self.strings.push(value);
        index
    }

    /// Add an integer constant, returning its pool index
    pub fn add_integer(&mut self, value: i64) -> u32 {
        if let Some(pos) = self.integers.iter().position(|&v| v == value) {
            return pos as u32;
        }
        let index = self.integers.len() as u32;
        self.integers.push(value);
        index
    }

    /// Add a float constant, returning its pool index
    pub fn add_float(&mut self, value: f64) -> u32 {
        if let Some(pos) = self.floats.iter().position(|&v| v.to_bits() == value.to_bits()) {
            return pos as u32;
        }
        let index = self.floats.len() as u32;
        self.floats.push(value);
        index
    }

    /// Get a string by pool index
    pub fn get_string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Get an integer by pool index
    pub fn get_integer(&self, index: u32) -> Option<i64> {
        self.integers.get(index as usize).copied()
    }

    /// Get a float by pool index
    pub fn get_float(&self, index: u32) -> Option<f64> {
        self.floats.get(index as usize).copied()
    }

    /// Number of strings in the pool
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Encode the pool to binary
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.strings.len() as u32);
        for s in &self.strings {
            writer.emit_string(s);
        }

        writer.emit_u32(self.integers.len() as u32);
        for &i in &self.integers {
            writer.emit_i64(i);
        }

        writer.emit_u32(self.floats.len() as u32);
        for &f in &self.floats {
            writer.emit_f64(f);
        }
    }

    /// Decode a pool from binary
    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let mut pool = Self::new();

        let string_count = reader.read_u32()? as usize;
        for _ in 0..string_count {
            let s = reader.read_string()?;
            pool.string_index.insert(s.clone(), pool.strings.len() as u32);
            pool.strings.push(s);
        }

        let integer_count = reader.read_u32()? as usize;
        for _ in 0..integer_count {
            pool.integers.push(reader.read_i64()?);
        }

        let float_count = reader.read_u32()? as usize;
        for _ in 0..float_count {
            pool.floats.push(reader.read_f64()?);
        }

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_interning() {
        let mut pool = ConstantPool::new();
        let a = pool.add_string("foo");
        let b = pool.add_string("bar");
        let c = pool.add_string("foo");

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, a);
        assert_eq!(pool.get_string(0), Some("foo"));
        assert_eq!(pool.get_string(1), Some("bar"));
        assert_eq!(pool.get_string(2), None);
    }

    #[test]
    fn test_numeric_constants() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.add_integer(42), 0);
        assert_eq!(pool.add_integer(42), 0);
        assert_eq!(pool.add_integer(-1), 1);
        assert_eq!(pool.add_float(3.5), 0);
        assert_eq!(pool.add_float(3.5), 0);

        assert_eq!(pool.get_integer(1), Some(-1));
        assert_eq!(pool.get_float(0), Some(3.5));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut pool = ConstantPool::new();
        pool.add_string("demo/Counter");
        pool.add_string("(I)V");
        pool.add_integer(7);
        pool.add_float(0.5);

        let mut writer = BytecodeWriter::new();
        pool.encode(&mut writer);
        let bytes = writer.into_bytes();

        let mut reader = BytecodeReader::new(&bytes);
        let decoded = ConstantPool::decode(&mut reader).unwrap();
        assert_eq!(decoded, pool);

        // Interning still consistent after decode
        let mut decoded = decoded;
        assert_eq!(decoded.add_string("demo/Counter"), 0);
        assert_eq!(decoded.add_string("(I)V"), 1);
    }
}
