//! Persisted row representation.
//!
//! A `Row` is the storage-side snapshot of a record: its identifier, a version
//! bumped on every persisted update, and the attribute values in column order.

use crate::value::Value;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a row (and the record backed by it).
pub type RowId = u64;

static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates the next unique row ID.
pub fn next_row_id() -> RowId {
    NEXT_ROW_ID.fetch_add(1, Ordering::SeqCst)
}

/// Raises the row ID counter so that `id` is never handed out again.
pub fn set_next_row_id_if_greater(id: RowId) {
    NEXT_ROW_ID.fetch_max(id, Ordering::SeqCst);
}

/// A persisted row.
#[derive(Clone, Debug)]
pub struct Row {
    id: RowId,
    version: u64,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row at version 1.
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self { id, version: 1, values }
    }

    /// Creates a row with an explicit version.
    pub fn new_with_version(id: RowId, version: u64, values: Vec<Value>) -> Self {
        Self { id, version, values }
    }

    /// Returns the row ID.
    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Returns the version number.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns a copy of this row with the version bumped and new values.
    pub fn next_version(&self, values: Vec<Value>) -> Self {
        Self {
            id: self.id,
            version: self.version.wrapping_add(1),
            values,
        }
    }

    /// Returns the values in column order.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Gets a value at the given column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of values in this row.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_row_new() {
        let row = Row::new(1, vec![Value::Int64(42), Value::String("Alice".into())]);
        assert_eq!(row.id(), 1);
        assert_eq!(row.version(), 1);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(1), Some(&Value::String("Alice".into())));
        assert_eq!(row.get(2), None);
    }

    #[test]
    fn test_next_version_keeps_id() {
        let row = Row::new(7, vec![Value::Int32(1)]);
        let next = row.next_version(vec![Value::Int32(2)]);
        assert_eq!(next.id(), 7);
        assert_eq!(next.version(), 2);
        assert_eq!(next.get(0), Some(&Value::Int32(2)));
    }

    #[test]
    fn test_row_ids_are_unique() {
        let a = next_row_id();
        let b = next_row_id();
        assert_ne!(a, b);

        set_next_row_id_if_greater(b + 100);
        assert!(next_row_id() >= b + 100);
    }
}
