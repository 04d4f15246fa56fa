//! Error types for Stagehand.

use crate::types::DataType;
use crate::value::Value;
use alloc::string::String;
use core::fmt;

/// Result type alias for Stagehand operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by records, proxies, caches and the persistence layer.
#[derive(Debug)]
pub enum Error {
    /// A proxy was requested for an absent source instance.
    NullSource,
    /// Reverse row lookup on an object that is not in the current cache window.
    NotCached {
        what: String,
    },
    /// Row position past the end of a row source.
    OutOfRange {
        index: usize,
        len: usize,
    },
    /// Attribute not reflected by the record type.
    UnknownAttribute {
        type_name: String,
        attribute: String,
    },
    /// Type mismatch error.
    TypeMismatch {
        expected: DataType,
        got: DataType,
    },
    /// Null constraint violation.
    NullConstraint {
        column: String,
    },
    /// Unique constraint violation.
    UniqueConstraint {
        column: String,
        value: Value,
    },
    /// Row or record not found.
    NotFound {
        table: String,
        key: Value,
    },
    /// Invalid schema definition.
    InvalidSchema {
        message: String,
    },
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
    /// An unsaved record the unit of work was never asked to insert.
    NotPending {
        type_name: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NullSource => write!(f, "Cannot wrap an absent source instance"),
            Error::NotCached { what } => write!(f, "Object was not in cache: {}", what),
            Error::OutOfRange { index, len } => {
                write!(f, "Row {} out of range for {} rows", index, len)
            }
            Error::UnknownAttribute {
                type_name,
                attribute,
            } => write!(f, "{} has no attribute {}", type_name, attribute),
            Error::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {:?}, got {:?}", expected, got)
            }
            Error::NullConstraint { column } => {
                write!(f, "Null constraint violation on column: {}", column)
            }
            Error::UniqueConstraint { column, value } => {
                write!(
                    f,
                    "Unique constraint violation on column {}: {:?}",
                    column, value
                )
            }
            Error::NotFound { table, key } => {
                write!(f, "Not found in table {}: {:?}", table, key)
            }
            Error::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
            Error::NotPending { type_name } => {
                write!(f, "Unsaved {} is not pending in the unit of work", type_name)
            }
        }
    }
}

impl Error {
    /// Creates a null source error.
    pub fn null_source() -> Self {
        Error::NullSource
    }

    /// Creates a not cached error.
    pub fn not_cached(what: impl Into<String>) -> Self {
        Error::NotCached { what: what.into() }
    }

    /// Creates an out of range error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Error::OutOfRange { index, len }
    }

    /// Creates an unknown attribute error.
    pub fn unknown_attribute(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Error::UnknownAttribute {
            type_name: type_name.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates a null constraint error.
    pub fn null_constraint(column: impl Into<String>) -> Self {
        Error::NullConstraint {
            column: column.into(),
        }
    }

    /// Creates a unique constraint error.
    pub fn unique_constraint(column: impl Into<String>, value: Value) -> Self {
        Error::UniqueConstraint {
            column: column.into(),
            value,
        }
    }

    /// Creates a not found error.
    pub fn not_found(table: impl Into<String>, key: Value) -> Self {
        Error::NotFound {
            table: table.into(),
            key,
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a not pending error.
    pub fn not_pending(type_name: impl Into<String>) -> Self {
        Error::NotPending {
            type_name: type_name.into(),
        }
    }

    /// Returns true for violations the persistence layer reports at commit.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::NullConstraint { .. } | Error::UniqueConstraint { .. }
        )
    }
}
