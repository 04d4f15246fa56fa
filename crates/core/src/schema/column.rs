//! Column definition for record schemas.

use crate::types::DataType;
use crate::value::Value;
use alloc::string::String;

/// A column (record attribute) definition.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: bool,
    unique: bool,
    default_value: Option<Value>,
    /// Position in the table (0-based).
    index: usize,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: data_type.is_nullable_by_default(),
            unique: false,
            default_value: None,
            index: 0,
        }
    }

    /// Sets whether this column is nullable.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets whether this column has unique values.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Sets the default value for this column.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns whether this column is nullable.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns whether this column has unique values.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Public columns are reflected as proxy attributes; `_`-prefixed ones are not.
    #[inline]
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }

    /// Returns the value a freshly created record starts with.
    ///
    /// New records start out empty (Null) unless a default was declared, so
    /// that a missing required value surfaces as a null constraint at commit.
    pub fn initial_value(&self) -> Value {
        self.default_value.clone().unwrap_or(Value::Null)
    }

    /// Returns the column position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Checks that `value` may be assigned to this column.
    ///
    /// Null is always accepted here; nullability is a commit-time constraint.
    pub fn accepts(&self, value: &Value) -> bool {
        match value.data_type() {
            None => true,
            Some(dt) => dt == self.data_type,
        }
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.data_type == other.data_type
    }
}
