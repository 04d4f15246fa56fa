//! Contracts between the proxy/grid layers and a persistence layer.
//!
//! The persistence layer owns records, runs queries and commits units of
//! work. After every successful commit it publishes a [`FlushEvent`] to the
//! listeners registered for the affected record types.

use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// The attribute values persisted for one record during a commit.
#[derive(Clone, Debug)]
pub struct RecordChanges {
    pub record: Record,
    pub values: Vec<(String, Value)>,
}

impl RecordChanges {
    pub fn new(record: Record, values: Vec<(String, Value)>) -> Self {
        Self { record, values }
    }

    /// Names of the written attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// The value written for `attribute`, if any.
    pub fn value(&self, attribute: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, v)| v)
    }
}

/// Everything persisted by one commit.
#[derive(Clone, Debug, Default)]
pub struct FlushEvent {
    pub changes: Vec<RecordChanges>,
}

impl FlushEvent {
    pub fn new(changes: Vec<RecordChanges>) -> Self {
        Self { changes }
    }

    /// Returns the part of this event touching records of `type_name`.
    pub fn for_type(&self, type_name: &str) -> FlushEvent {
        FlushEvent {
            changes: self
                .changes
                .iter()
                .filter(|c| c.record.type_name() == type_name)
                .cloned()
                .collect(),
        }
    }

    /// Distinct record types present in this event, in first-seen order.
    pub fn source_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for change in &self.changes {
            let name = change.record.type_name();
            if !types.contains(&name) {
                types.push(name);
            }
        }
        types
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Callback receiving flush events.
pub type FlushListener = Rc<dyn Fn(&FlushEvent)>;

/// Source of post-commit flush events.
pub trait ChangeFeed {
    /// Registers `listener` for flushes touching records of `source_type`.
    ///
    /// The listener only sees the part of each event for that type.
    fn listen(&self, source_type: &str, listener: FlushListener);
}

/// A remotely counted, sliceable result set.
pub trait RecordQuery {
    /// Total number of records matched.
    fn count(&self) -> Result<usize>;

    /// Records at positions `[start, stop)`, clamped to the result size.
    fn slice(&self, start: usize, stop: usize) -> Result<Vec<Record>>;

    /// This query narrowed with a LIKE `pattern` on `attribute`.
    fn filter_like(&self, attribute: &str, pattern: &str) -> Result<QueryHandle>;
}

/// Shared handle to a query.
pub type QueryHandle = Rc<dyn RecordQuery>;

/// A transactional unit of work.
///
/// Methods take `&self`: the unit of work is a shared handle used from
/// callbacks, so it manages its own interior state.
pub trait UnitOfWork {
    /// Schedules `record` for insert (transient) or update (persistent).
    fn add(&self, record: &Record) -> Result<()>;

    /// Schedules `record` for deletion.
    fn delete(&self, record: &Record) -> Result<()>;

    /// Writes all pending work. On error nothing is persisted.
    fn commit(&self) -> Result<()>;

    /// Discards pending work and reverts records to their persisted values.
    fn rollback(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableBuilder;
    use crate::types::DataType;
    use alloc::vec;

    fn record(table: &str) -> Record {
        Record::new(Rc::new(
            TableBuilder::new(table)
                .unwrap()
                .add_column("name", DataType::String)
                .unwrap()
                .build()
                .unwrap(),
        ))
    }

    #[test]
    fn test_for_type_filters_changes() {
        let skater = record("skater");
        let club = record("club");
        let event = FlushEvent::new(vec![
            RecordChanges::new(skater.clone(), vec![("name".into(), Value::from("Bouke"))]),
            RecordChanges::new(club, vec![("name".into(), Value::from("IJsclub"))]),
        ]);

        assert_eq!(event.source_types(), vec!["skater", "club"]);

        let only = event.for_type("skater");
        assert_eq!(only.len(), 1);
        assert_eq!(only.changes[0].record, skater);
        assert_eq!(only.changes[0].value("name"), Some(&Value::from("Bouke")));
        assert_eq!(only.changes[0].attributes().collect::<Vec<_>>(), vec!["name"]);
        assert!(event.for_type("rink").is_empty());
    }
}
