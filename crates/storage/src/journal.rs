//! Journal for tracking changes made by a transaction.
//!
//! Changes are applied to the `TableCache` eagerly; the journal remembers
//! enough to undo them in reverse order.

use crate::cache::TableCache;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use stagehand_core::{Result, Row, RowId};

/// A single journal entry representing a change.
#[derive(Clone, Debug)]
pub enum JournalEntry {
    /// A row was inserted.
    Insert {
        table: String,
        row_id: RowId,
        row: Row,
    },
    /// A row was updated.
    Update {
        table: String,
        row_id: RowId,
        old: Row,
        new: Row,
    },
    /// A row was deleted.
    Delete {
        table: String,
        row_id: RowId,
        row: Row,
    },
}

impl JournalEntry {
    /// Returns the table name for this entry.
    pub fn table(&self) -> &str {
        match self {
            JournalEntry::Insert { table, .. } => table,
            JournalEntry::Update { table, .. } => table,
            JournalEntry::Delete { table, .. } => table,
        }
    }

    /// Returns the row ID for this entry.
    pub fn row_id(&self) -> RowId {
        match self {
            JournalEntry::Insert { row_id, .. } => *row_id,
            JournalEntry::Update { row_id, .. } => *row_id,
            JournalEntry::Delete { row_id, .. } => *row_id,
        }
    }
}

/// Per-table count of committed changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Groups journal entries by table.
pub fn summarize(entries: &[JournalEntry]) -> BTreeMap<&str, ChangeCounts> {
    let mut tables: BTreeMap<&str, ChangeCounts> = BTreeMap::new();
    for entry in entries {
        let counts = tables.entry(entry.table()).or_default();
        match entry {
            JournalEntry::Insert { .. } => counts.inserted += 1,
            JournalEntry::Update { .. } => counts.updated += 1,
            JournalEntry::Delete { .. } => counts.deleted += 1,
        }
    }
    tables
}

/// Journal for tracking changes within a transaction.
#[derive(Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert operation.
    pub fn record_insert(&mut self, table: &str, row: Row) {
        let row_id = row.id();
        self.entries.push(JournalEntry::Insert {
            table: table.into(),
            row_id,
            row,
        });
    }

    /// Records an update operation.
    pub fn record_update(&mut self, table: &str, old: Row, new: Row) {
        let row_id = old.id();
        self.entries.push(JournalEntry::Update {
            table: table.into(),
            row_id,
            old,
            new,
        });
    }

    /// Records a delete operation.
    pub fn record_delete(&mut self, table: &str, row: Row) {
        let row_id = row.id();
        self.entries.push(JournalEntry::Delete {
            table: table.into(),
            row_id,
            row,
        });
    }

    /// Returns all journal entries.
    pub fn get_entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns true if the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalizes the journal. Changes were applied as they were recorded.
    pub fn commit(&mut self) -> Vec<JournalEntry> {
        core::mem::take(&mut self.entries)
    }

    /// Undoes the recorded changes, newest first.
    pub fn rollback(&mut self, cache: &mut TableCache) -> Result<()> {
        for entry in self.entries.iter().rev() {
            match entry {
                JournalEntry::Insert { table, row_id, .. } => {
                    if let Some(store) = cache.get_table_mut(table) {
                        store.delete(*row_id)?;
                    }
                }
                JournalEntry::Update {
                    table,
                    row_id,
                    old,
                    new,
                } => {
                    if let Some(store) = cache.get_table_mut(table) {
                        // Versions only grow, even across a rollback
                        let restored = Row::new_with_version(
                            old.id(),
                            new.version().wrapping_add(1),
                            old.values().to_vec(),
                        );
                        store.update(*row_id, restored)?;
                    }
                }
                JournalEntry::Delete { table, row, .. } => {
                    if let Some(store) = cache.get_table_mut(table) {
                        store.insert(row.clone())?;
                    }
                }
            }
        }

        self.clear();
        Ok(())
    }

    /// Clears the journal without applying changes.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
