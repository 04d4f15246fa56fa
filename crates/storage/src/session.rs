//! Sessions: unit of work, identity map and flush event feed.
//!
//! A `Session` is a cheap handle shared by everything that talks to the
//! store. It hands out one `Record` per stored row (the identity map),
//! tracks records scheduled for insert or delete, and on `commit` writes
//! inserts, dirty records and deletes through one journaled transaction.
//! When the transaction succeeds the session publishes a `FlushEvent` with
//! the attribute values it wrote; when it fails nothing is persisted and
//! every dirty record is reverted to its stored values.

use crate::cache::TableCache;
use crate::journal::summarize;
use crate::query::Query;
use crate::row_store::RowStore;
use crate::transaction::Transaction;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use stagehand_core::schema::Table;
use stagehand_core::{
    ChangeFeed, Error, FlushEvent, FlushListener, Record, RecordChanges, RecordState, Result, Row,
    RowId, UnitOfWork,
};
use stagehand_reactive::{FlushRegistry, SubscriptionId};

type IdentityKey = (String, RowId);

struct SessionState {
    cache: RefCell<TableCache>,
    schemas: RefCell<HashMap<String, Rc<Table>>>,
    identity: RefCell<HashMap<IdentityKey, Record>>,
    new: RefCell<Vec<Record>>,
    deleted: RefCell<Vec<Record>>,
    feed: FlushRegistry,
    flushing: Cell<bool>,
}

/// In-memory persistence session.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn identity_key(record: &Record) -> IdentityKey {
    (record.type_name().to_string(), record.id())
}

impl Session {
    /// Creates an empty session with no tables.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SessionState {
                cache: RefCell::new(TableCache::new()),
                schemas: RefCell::new(HashMap::new()),
                identity: RefCell::new(HashMap::new()),
                new: RefCell::new(Vec::new()),
                deleted: RefCell::new(Vec::new()),
                feed: FlushRegistry::new(),
                flushing: Cell::new(false),
            }),
        }
    }

    /// Registers a record type.
    pub fn create_table(&self, schema: Table) -> Result<Rc<Table>> {
        let schema = Rc::new(schema);
        self.inner.cache.borrow_mut().create_table(schema.clone())?;
        self.inner
            .schemas
            .borrow_mut()
            .insert(schema.name().to_string(), schema.clone());
        Ok(schema)
    }

    /// Returns the schema of a registered record type.
    pub fn schema(&self, type_name: &str) -> Result<Rc<Table>> {
        self.inner
            .schemas
            .borrow()
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::table_not_found(type_name))
    }

    /// Creates a transient record of `type_name`. It is not scheduled for
    /// insert until it is added.
    pub fn create(&self, type_name: &str) -> Result<Record> {
        Ok(Record::new(self.schema(type_name)?))
    }

    /// Looks a record up by id, loading it into the identity map if needed.
    pub fn get(&self, type_name: &str, id: RowId) -> Result<Option<Record>> {
        let schema = self.schema(type_name)?;
        let row = self.inner.cache.borrow().get_row(type_name, id);
        Ok(row.map(|row| self.materialize(&schema, &row)))
    }

    /// Starts a query over all records of `type_name`.
    pub fn query(&self, type_name: &str) -> Result<Query> {
        Ok(Query::new(self.clone(), self.schema(type_name)?))
    }

    /// The feed that receives a flush event after every successful commit.
    pub fn feed(&self) -> &FlushRegistry {
        &self.inner.feed
    }

    /// Registers a flush listener and returns its id.
    pub fn listen_with_id(&self, source_type: &str, listener: FlushListener) -> SubscriptionId {
        self.inner.feed.listen(source_type, listener)
    }

    /// Returns true while a flush event is being dispatched.
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Persistent records with unflushed changes, by id.
    pub fn dirty(&self) -> Vec<Record> {
        let mut dirty: Vec<Record> = self
            .inner
            .identity
            .borrow()
            .values()
            .filter(|r| r.state() == RecordState::Persistent && r.is_dirty())
            .cloned()
            .collect();
        dirty.sort_by_key(|r| r.id());
        dirty
    }

    /// Records scheduled for insert.
    pub fn pending_inserts(&self) -> Vec<Record> {
        self.inner.new.borrow().clone()
    }

    /// Records scheduled for delete.
    pub fn pending_deletes(&self) -> Vec<Record> {
        self.inner.deleted.borrow().clone()
    }

    /// Returns true if a commit would write anything.
    pub fn has_pending(&self) -> bool {
        !self.inner.new.borrow().is_empty()
            || !self.inner.deleted.borrow().is_empty()
            || !self.dirty().is_empty()
    }

    /// Runs `f` against the store of `type_name`.
    pub(crate) fn with_store<R>(&self, type_name: &str, f: impl FnOnce(&RowStore) -> R) -> Result<R> {
        let cache = self.inner.cache.borrow();
        let store = cache
            .get_table(type_name)
            .ok_or_else(|| Error::table_not_found(type_name))?;
        Ok(f(store))
    }

    /// Returns the identity-mapped record for a stored row.
    pub(crate) fn materialize(&self, schema: &Rc<Table>, row: &Row) -> Record {
        let key = (schema.name().to_string(), row.id());
        let mut identity = self.inner.identity.borrow_mut();
        identity
            .entry(key)
            .or_insert_with(|| Record::from_row(schema.clone(), row))
            .clone()
    }

    fn check_registered(&self, record: &Record) -> Result<()> {
        if self.inner.schemas.borrow().contains_key(record.type_name()) {
            Ok(())
        } else {
            Err(Error::table_not_found(record.type_name()))
        }
    }

    fn apply(
        tx: &mut Transaction,
        cache: &mut TableCache,
        inserts: &[Record],
        updates: &[Record],
        deletes: &[Record],
    ) -> Result<()> {
        for record in inserts {
            tx.insert(cache, record.type_name(), record.to_row(1))?;
        }
        for record in updates {
            tx.update(cache, record.type_name(), record.id(), record.values())?;
        }
        for record in deletes {
            tx.delete(cache, record.type_name(), record.id())?;
        }
        Ok(())
    }

    /// Puts every dirty persistent record back to its stored values.
    fn revert_dirty(&self) {
        let cache = self.inner.cache.borrow();
        for record in self.dirty() {
            match cache.get_row(record.type_name(), record.id()) {
                Some(row) => record.reset_from(&row),
                None => record.clear_changes(),
            }
        }
    }

    fn commit_inner(&self) -> Result<()> {
        if self.inner.flushing.get() {
            return Err(Error::invalid_operation(
                "Commit requested while a flush event is being dispatched",
            ));
        }

        let inserts = core::mem::take(&mut *self.inner.new.borrow_mut());
        let deletes = core::mem::take(&mut *self.inner.deleted.borrow_mut());
        let updates: Vec<Record> = self
            .dirty()
            .into_iter()
            .filter(|r| !deletes.contains(r))
            .collect();

        if inserts.is_empty() && updates.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let mut tx = Transaction::begin();
        let committed = {
            let mut cache = self.inner.cache.borrow_mut();
            match Self::apply(&mut tx, &mut cache, &inserts, &updates, &deletes) {
                Ok(()) => tx.commit().map(|entries| {
                    for (table, counts) in summarize(&entries) {
                        tracing::debug!(
                            table,
                            inserted = counts.inserted,
                            updated = counts.updated,
                            deleted = counts.deleted,
                            "committed"
                        );
                    }
                }),
                Err(err) => {
                    if let Err(undo) = tx.rollback(&mut cache) {
                        tracing::error!(error = %undo, "transaction rollback failed");
                    }
                    Err(err)
                }
            }
        };

        if let Err(err) = committed {
            tracing::warn!(error = %err, "commit failed, rolled back");
            self.revert_dirty();
            return Err(err);
        }

        let mut changes = Vec::with_capacity(inserts.len() + updates.len());
        {
            let mut identity = self.inner.identity.borrow_mut();
            for record in &inserts {
                record.clear_changes();
                record.set_state(RecordState::Persistent);
                identity.insert(identity_key(record), record.clone());
                let values = record
                    .schema()
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .zip(record.values())
                    .collect();
                changes.push(RecordChanges::new(record.clone(), values));
            }
            for record in &updates {
                changes.push(RecordChanges::new(record.clone(), record.take_changes()));
            }
            for record in &deletes {
                record.clear_changes();
                record.set_state(RecordState::Deleted);
                identity.remove(&identity_key(record));
            }
        }

        let event = FlushEvent::new(changes);
        if !event.is_empty() {
            self.inner.flushing.set(true);
            self.inner.feed.dispatch(&event);
            self.inner.flushing.set(false);
        }
        Ok(())
    }
}

impl UnitOfWork for Session {
    fn add(&self, record: &Record) -> Result<()> {
        self.check_registered(record)?;
        match record.state() {
            RecordState::Deleted => Err(Error::invalid_operation("Cannot add a deleted record")),
            RecordState::Transient => {
                let mut new = self.inner.new.borrow_mut();
                if !new.contains(record) {
                    new.push(record.clone());
                }
                Ok(())
            }
            RecordState::Persistent => {
                self.inner.deleted.borrow_mut().retain(|r| r != record);
                self.inner
                    .identity
                    .borrow_mut()
                    .entry(identity_key(record))
                    .or_insert_with(|| record.clone());
                Ok(())
            }
        }
    }

    fn delete(&self, record: &Record) -> Result<()> {
        self.check_registered(record)?;
        match record.state() {
            RecordState::Transient => {
                let mut new = self.inner.new.borrow_mut();
                let before = new.len();
                new.retain(|r| r != record);
                if new.len() == before {
                    return Err(Error::not_pending(record.type_name()));
                }
                Ok(())
            }
            RecordState::Persistent => {
                let mut deleted = self.inner.deleted.borrow_mut();
                if !deleted.contains(record) {
                    deleted.push(record.clone());
                }
                Ok(())
            }
            RecordState::Deleted => Err(Error::invalid_operation("Record is already deleted")),
        }
    }

    fn commit(&self) -> Result<()> {
        self.commit_inner()
    }

    fn rollback(&self) {
        self.inner.new.borrow_mut().clear();
        self.inner.deleted.borrow_mut().clear();
        self.revert_dirty();
        tracing::debug!("session rolled back");
    }
}

impl ChangeFeed for Session {
    fn listen(&self, source_type: &str, listener: FlushListener) {
        self.inner.feed.listen(source_type, listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use stagehand_core::schema::TableBuilder;
    use stagehand_core::{DataType, RecordQuery, Value};

    fn session() -> Session {
        let session = Session::new();
        session
            .create_table(
                TableBuilder::new("skater")
                    .unwrap()
                    .add_column("first_name", DataType::String)
                    .unwrap()
                    .add_column("last_name", DataType::String)
                    .unwrap()
                    .add_column("email", DataType::String)
                    .unwrap()
                    .add_nullable(&["email"])
                    .add_unique("email")
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        session
    }

    fn skater(session: &Session, first: &str, last: &str) -> Record {
        let record = session.create("skater").unwrap();
        record.set("first_name", first).unwrap();
        record.set("last_name", last).unwrap();
        record
    }

    #[test]
    fn test_insert_commit_makes_record_persistent() {
        let session = session();
        let record = skater(&session, "Bouke", "Beumer");
        session.add(&record).unwrap();
        session.commit().unwrap();

        assert_eq!(record.state(), RecordState::Persistent);
        assert!(!record.is_dirty());
        let loaded = session.get("skater", record.id()).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_flush_event_carries_written_values() {
        let session = session();
        let record = skater(&session, "Bouke", "Beumer");
        session.add(&record).unwrap();
        session.commit().unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.listen(
            "skater",
            Rc::new(move |e: &FlushEvent| sink.borrow_mut().push(e.clone())),
        );

        record.set("last_name", "Boukema").unwrap();
        session.commit().unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        let change = &events[0].changes[0];
        assert_eq!(change.record, record);
        assert_eq!(
            change.values,
            vec![("last_name".to_string(), Value::from("Boukema"))]
        );
    }

    #[test]
    fn test_failed_commit_reverts_dirty_records() {
        let session = session();
        let a = skater(&session, "A", "A");
        a.set("email", "same@x").unwrap();
        let b = skater(&session, "B", "B");
        session.add(&a).unwrap();
        session.add(&b).unwrap();
        session.commit().unwrap();

        b.set("email", "same@x").unwrap();
        b.set("first_name", "Bee").unwrap();
        let err = session.commit().unwrap_err();
        assert!(err.is_constraint_violation());

        assert_eq!(b.get("first_name").unwrap(), Value::from("B"));
        assert_eq!(b.get("email").unwrap(), Value::Null);
        assert!(!session.has_pending());
    }

    #[test]
    fn test_failed_insert_persists_nothing() {
        let session = session();
        let ok = skater(&session, "A", "A");
        let missing_name = session.create("skater").unwrap();
        session.add(&ok).unwrap();
        session.add(&missing_name).unwrap();

        assert!(matches!(
            session.commit(),
            Err(Error::NullConstraint { .. })
        ));
        assert_eq!(ok.state(), RecordState::Transient);
        assert_eq!(session.query("skater").unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let session = session();
        let record = skater(&session, "A", "A");
        session.add(&record).unwrap();
        session.commit().unwrap();

        session.delete(&record).unwrap();
        session.commit().unwrap();
        assert_eq!(record.state(), RecordState::Deleted);
        assert!(session.get("skater", record.id()).unwrap().is_none());
        assert!(session.add(&record).is_err());
    }

    #[test]
    fn test_delete_of_pending_insert_expunges_it() {
        let session = session();
        let record = skater(&session, "A", "A");
        assert!(matches!(
            session.delete(&record),
            Err(Error::NotPending { .. })
        ));

        session.add(&record).unwrap();
        session.delete(&record).unwrap();
        assert!(session.pending_inserts().is_empty());
    }

    #[test]
    fn test_rollback_reverts_and_clears() {
        let session = session();
        let record = skater(&session, "A", "A");
        session.add(&record).unwrap();
        session.commit().unwrap();

        record.set("first_name", "Changed").unwrap();
        session.add(&skater(&session, "B", "B")).unwrap();
        session.rollback();

        assert_eq!(record.get("first_name").unwrap(), Value::from("A"));
        assert!(!session.has_pending());
    }

    #[test]
    fn test_commit_during_dispatch_is_rejected() {
        let session = session();
        let record = skater(&session, "A", "A");
        session.add(&record).unwrap();

        let nested = Rc::new(RefCell::new(None));
        let sink = nested.clone();
        let inner = session.clone();
        session.listen(
            "skater",
            Rc::new(move |_: &FlushEvent| {
                *sink.borrow_mut() = Some(inner.commit().is_err());
            }),
        );

        session.commit().unwrap();
        assert_eq!(*nested.borrow(), Some(true));
        assert!(!session.is_flushing());
    }

    #[test]
    fn test_unknown_type() {
        let session = session();
        assert!(matches!(
            session.create("rink"),
            Err(Error::TableNotFound { .. })
        ));
    }
}
