//! Data type definitions for Stagehand records.
//!
//! This module defines the attribute types a record schema can declare.

/// Supported attribute data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Binary data
    Bytes,
    /// Reference to another record (a relation attribute)
    Reference,
}

impl DataType {
    /// Returns whether this type is nullable by default.
    pub fn is_nullable_by_default(&self) -> bool {
        matches!(self, DataType::Bytes | DataType::Reference)
    }

    /// Returns whether this type can back a primary key or unique constraint.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, DataType::Bytes | DataType::Reference)
    }
}
