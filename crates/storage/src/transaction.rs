//! Transactions over a `TableCache`.
//!
//! Writes go straight to the cache and are journaled; `rollback` undoes
//! them, `commit` keeps them and returns the journal entries.

use crate::cache::TableCache;
use crate::journal::{Journal, JournalEntry};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use stagehand_core::{Error, Result, Row, RowId, Value};

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Transaction ID type.
pub type TransactionId = u64;

/// Transaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

/// A journaled transaction.
pub struct Transaction {
    id: TransactionId,
    journal: Journal,
    state: TransactionState,
}

impl Transaction {
    /// Creates a new transaction.
    pub fn begin() -> Self {
        Self {
            id: NEXT_TX_ID.fetch_add(1, Ordering::SeqCst),
            journal: Journal::new(),
            state: TransactionState::Active,
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns true if the transaction is active.
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::invalid_operation("Transaction is not active"));
        }
        Ok(())
    }

    /// Inserts a row within this transaction.
    pub fn insert(&mut self, cache: &mut TableCache, table: &str, row: Row) -> Result<RowId> {
        self.check_active()?;

        let store = cache
            .get_table_mut(table)
            .ok_or_else(|| Error::table_not_found(table))?;
        let row_id = store.insert(row.clone())?;

        self.journal.record_insert(table, row);
        Ok(row_id)
    }

    /// Replaces a row within this transaction. The new row gets the next version.
    pub fn update(
        &mut self,
        cache: &mut TableCache,
        table: &str,
        row_id: RowId,
        values: Vec<Value>,
    ) -> Result<Row> {
        self.check_active()?;

        let store = cache
            .get_table_mut(table)
            .ok_or_else(|| Error::table_not_found(table))?;
        let old_row = store
            .get(row_id)
            .ok_or_else(|| Error::not_found(table, Value::Int64(row_id as i64)))?;

        let old_row = (*old_row).clone();
        let new_row = old_row.next_version(values);
        store.update(row_id, new_row.clone())?;
        self.journal.record_update(table, old_row, new_row.clone());
        Ok(new_row)
    }

    /// Deletes a row within this transaction.
    pub fn delete(&mut self, cache: &mut TableCache, table: &str, row_id: RowId) -> Result<Row> {
        self.check_active()?;

        let store = cache
            .get_table_mut(table)
            .ok_or_else(|| Error::table_not_found(table))?;
        let row = (*store.delete(row_id)?).clone();

        self.journal.record_delete(table, row.clone());
        Ok(row)
    }

    /// Commits the transaction.
    pub fn commit(mut self) -> Result<Vec<JournalEntry>> {
        self.check_active()?;
        self.state = TransactionState::Committed;
        Ok(self.journal.commit())
    }

    /// Rolls back the transaction.
    pub fn rollback(mut self, cache: &mut TableCache) -> Result<()> {
        self.check_active()?;
        self.state = TransactionState::RolledBack;
        self.journal.rollback(cache)
    }
}
