//! Records: the mutable, shared source instances owned by a persistence layer.
//!
//! A [`Record`] is a cheap handle (`Rc`) to one object. It carries its schema,
//! its current attribute values, the set of attributes changed since the last
//! flush, and its lifecycle state. Equality is identity.
//!
//! Every record also owns a [`BackRefs`] collection: weak references to the
//! objects wrapping it. Entries never keep their target alive and are pruned
//! the next time the collection is read.

use crate::error::{Error, Result};
use crate::row::{next_row_id, Row, RowId};
use crate::schema::Table;
use crate::value::Value;
use alloc::collections::BTreeSet;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Lifecycle of a record relative to its persistence layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// Created locally, not yet persisted.
    Transient,
    /// Backed by a stored row.
    Persistent,
    /// Its stored row has been deleted.
    Deleted,
}

/// Weak back-references from a record to its wrappers.
#[derive(Default)]
pub struct BackRefs {
    refs: RefCell<Vec<Weak<dyn Any>>>,
}

impl BackRefs {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `target` without taking ownership of it.
    pub fn attach<T: Any>(&self, target: &Rc<T>) {
        let weak: Weak<T> = Rc::downgrade(target);
        let weak: Weak<dyn Any> = weak;
        self.refs.borrow_mut().push(weak);
    }

    /// Returns every live entry of type `T`, pruning dead entries.
    ///
    /// The returned handles are strong, so the collection is not borrowed
    /// while the caller works with them.
    pub fn live<T: Any>(&self) -> Vec<Rc<T>> {
        let mut refs = self.refs.borrow_mut();
        refs.retain(|w| w.strong_count() > 0);
        refs.iter()
            .filter_map(|w| w.upgrade())
            .filter_map(|rc| rc.downcast::<T>().ok())
            .collect()
    }

    /// Number of entries still alive. Does not prune.
    pub fn live_count(&self) -> usize {
        self.refs
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Number of entries held, dead ones included.
    pub fn len(&self) -> usize {
        self.refs.borrow().len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.refs.borrow().is_empty()
    }
}

struct RecordInner {
    id: RowId,
    schema: Rc<Table>,
    values: RefCell<Vec<Value>>,
    changed: RefCell<BTreeSet<usize>>,
    state: Cell<RecordState>,
    backrefs: BackRefs,
}

/// A shared handle to a source instance.
#[derive(Clone)]
pub struct Record(Rc<RecordInner>);

impl Record {
    /// Creates a transient record with every attribute at its initial value.
    pub fn new(schema: Rc<Table>) -> Self {
        let values = schema.columns().iter().map(|c| c.initial_value()).collect();
        Self::with_state(next_row_id(), schema, values, RecordState::Transient)
    }

    /// Materialises a persistent record from a stored row.
    pub fn from_row(schema: Rc<Table>, row: &Row) -> Self {
        Self::with_state(
            row.id(),
            schema,
            row.values().to_vec(),
            RecordState::Persistent,
        )
    }

    fn with_state(id: RowId, schema: Rc<Table>, values: Vec<Value>, state: RecordState) -> Self {
        Record(Rc::new(RecordInner {
            id,
            schema,
            values: RefCell::new(values),
            changed: RefCell::new(BTreeSet::new()),
            state: Cell::new(state),
            backrefs: BackRefs::new(),
        }))
    }

    /// Returns the record identifier (the backing row id).
    #[inline]
    pub fn id(&self) -> RowId {
        self.0.id
    }

    /// Returns the record type.
    #[inline]
    pub fn schema(&self) -> &Rc<Table> {
        &self.0.schema
    }

    /// Returns the record type name.
    #[inline]
    pub fn type_name(&self) -> &str {
        self.0.schema.name()
    }

    /// Returns the names of the public attributes.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.0.schema.attribute_names()
    }

    /// Returns the lifecycle state.
    #[inline]
    pub fn state(&self) -> RecordState {
        self.0.state.get()
    }

    /// Sets the lifecycle state. Reserved for the persistence layer.
    pub fn set_state(&self, state: RecordState) {
        self.0.state.set(state);
    }

    fn column_index(&self, attribute: &str) -> Result<usize> {
        self.0
            .schema
            .get_column_index(attribute)
            .ok_or_else(|| Error::unknown_attribute(self.type_name(), attribute))
    }

    /// Reads an attribute by name.
    pub fn get(&self, attribute: &str) -> Result<Value> {
        let index = self.column_index(attribute)?;
        self.get_at(index)
    }

    /// Reads an attribute by column position.
    pub fn get_at(&self, index: usize) -> Result<Value> {
        let values = self.0.values.borrow();
        values
            .get(index)
            .cloned()
            .ok_or_else(|| Error::out_of_range(index, values.len()))
    }

    /// Writes an attribute by name.
    ///
    /// Writing the value already held is a no-op and does not mark the
    /// attribute as changed.
    pub fn set(&self, attribute: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.column_index(attribute)?;
        self.set_at(index, value.into())
    }

    /// Writes an attribute by column position.
    pub fn set_at(&self, index: usize, value: Value) -> Result<()> {
        let column = self
            .0
            .schema
            .columns()
            .get(index)
            .ok_or_else(|| Error::out_of_range(index, self.0.schema.columns().len()))?;
        if !column.accepts(&value) {
            // accepts() only rejects non-null values
            let got = value.data_type().unwrap_or(column.data_type());
            return Err(Error::type_mismatch(column.data_type(), got));
        }

        let mut values = self.0.values.borrow_mut();
        if values[index] == value {
            return Ok(());
        }
        values[index] = value;
        self.0.changed.borrow_mut().insert(index);
        Ok(())
    }

    /// Names of the attributes changed since the last flush, in column order.
    pub fn changed_attributes(&self) -> Vec<String> {
        let columns = self.0.schema.columns();
        self.0
            .changed
            .borrow()
            .iter()
            .filter_map(|&i| columns.get(i).map(|c| c.name().to_string()))
            .collect()
    }

    /// Returns true if any attribute changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        !self.0.changed.borrow().is_empty()
    }

    /// Drains the changed set, returning `(attribute, current value)` pairs.
    pub fn take_changes(&self) -> Vec<(String, Value)> {
        let changed = core::mem::take(&mut *self.0.changed.borrow_mut());
        let columns = self.0.schema.columns();
        let values = self.0.values.borrow();
        changed
            .into_iter()
            .filter_map(|i| {
                let column = columns.get(i)?;
                Some((column.name().to_string(), values[i].clone()))
            })
            .collect()
    }

    /// Forgets which attributes changed.
    pub fn clear_changes(&self) {
        self.0.changed.borrow_mut().clear();
    }

    /// Returns a copy of the current values in column order.
    pub fn values(&self) -> Vec<Value> {
        self.0.values.borrow().clone()
    }

    /// Snapshot of the record as a row at `version`.
    pub fn to_row(&self, version: u64) -> Row {
        Row::new_with_version(self.0.id, version, self.values())
    }

    /// Replaces every value with the stored row's and clears the changed set.
    pub fn reset_from(&self, row: &Row) {
        *self.0.values.borrow_mut() = row.values().to_vec();
        self.clear_changes();
    }

    /// The weak back-reference collection of this record.
    #[inline]
    pub fn backrefs(&self) -> &BackRefs {
        &self.0.backrefs
    }

    /// Returns true if both handles point at the same instance.
    #[inline]
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name()
            .cmp(other.type_name())
            .then(self.id().cmp(&other.id()))
            .then(self.addr().cmp(&other.addr()))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({}#{})", self.type_name(), self.id())
    }
}
