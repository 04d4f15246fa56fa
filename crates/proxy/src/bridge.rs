//! Reconciliation of persisted changes into live proxies.
//!
//! After a commit the persistence layer reports, per record, the attribute
//! values it wrote. The bridge walks every live proxy of each record and
//! either settles a matching staged value or tells observers about the new
//! value. Observer callbacks may write the same record again while this
//! happens; those writes are picked up by recomputing the pending set after
//! every attribute, and each attribute is processed at most once per run.

use crate::proxy::{Proxy, ProxyInner, Reconciled};
use alloc::string::{String, ToString};
use core::cell::Cell;
use hashbrown::HashSet;
use stagehand_core::{FlushEvent, Record, RecordChanges};

/// Counters for one reconciliation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records visited.
    pub records: usize,
    /// Attributes processed, summed over records.
    pub processed: usize,
    /// Notifications raised.
    pub notified: usize,
    /// Staged values confirmed and dropped.
    pub settled: usize,
    /// Staged values kept over a different persisted value.
    pub kept: usize,
}

impl ReconcileStats {
    fn absorb(&mut self, outcome: Reconciled) {
        match outcome {
            Reconciled::Notified => self.notified += 1,
            Reconciled::Settled => self.settled += 1,
            Reconciled::StagedWins => self.kept += 1,
            Reconciled::Unchanged | Reconciled::Ignored => {}
        }
    }
}

/// Fans persisted changes out to the proxies of each changed record.
#[derive(Default)]
pub struct ChangeBridge {
    runs: Cell<u64>,
}

impl ChangeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flush events reconciled so far.
    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    /// Reconciles one flush event. Runs to its fixed point before returning.
    pub fn reconcile(&self, event: &FlushEvent) -> ReconcileStats {
        self.runs.set(self.runs.get() + 1);
        let mut stats = ReconcileStats::default();
        for changes in &event.changes {
            stats.records += 1;
            self.reconcile_record(changes, &mut stats);
        }
        tracing::debug!(
            records = stats.records,
            processed = stats.processed,
            notified = stats.notified,
            settled = stats.settled,
            kept = stats.kept,
            "reconciled flush"
        );
        stats
    }

    fn reconcile_record(&self, changes: &RecordChanges, stats: &mut ReconcileStats) {
        let record = &changes.record;
        let mut processed: HashSet<String> = HashSet::new();

        while let Some(attribute) = next_pending(changes, record, &processed) {
            processed.insert(attribute.clone());
            stats.processed += 1;

            // The persisted value decides, even when a handler has already
            // moved the record on. Attributes only picked up from the
            // record's own changes have no persisted value yet.
            let value = match changes.value(&attribute) {
                Some(value) => value.clone(),
                None => match record.get(&attribute) {
                    Ok(value) => value,
                    Err(_) => continue,
                },
            };

            // Re-read the back-references every round: handlers may have
            // wrapped the record again or dropped their proxies.
            for inner in record.backrefs().live::<ProxyInner>() {
                let proxy = Proxy(inner);
                let outcome = proxy.reconcile(&attribute, &value);
                tracing::trace!(
                    proxy = ?proxy,
                    attribute = attribute.as_str(),
                    outcome = ?outcome,
                    "reconcile"
                );
                stats.absorb(outcome);
            }
        }
    }
}

/// First attribute of the event or of the record's current changes that has
/// not been processed in this run.
fn next_pending(
    changes: &RecordChanges,
    record: &Record,
    processed: &HashSet<String>,
) -> Option<String> {
    changes
        .attributes()
        .map(|a| a.to_string())
        .chain(record.changed_attributes())
        .find(|a| !processed.contains(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Mode, ProxyType};
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use stagehand_core::schema::TableBuilder;
    use stagehand_core::{DataType, Value};

    fn record() -> Record {
        Record::new(Rc::new(
            TableBuilder::new("skater")
                .unwrap()
                .add_column("first_name", DataType::String)
                .unwrap()
                .add_column("age", DataType::Int32)
                .unwrap()
                .build()
                .unwrap(),
        ))
    }

    fn wrap(record: &Record, mode: Mode) -> Proxy {
        let proxy = Proxy::new(
            record.clone(),
            Rc::new(ProxyType::reflect(record.schema(), mode)),
        );
        record.backrefs().attach(&proxy.0);
        proxy
    }

    fn persisted(record: &Record, attribute: &str, value: Value) -> FlushEvent {
        record.set(attribute, value.clone()).unwrap();
        record.clear_changes();
        FlushEvent::new(vec![RecordChanges::new(
            record.clone(),
            vec![(attribute.to_string(), value)],
        )])
    }

    #[test]
    fn test_notifies_every_live_proxy() {
        let record = record();
        let a = wrap(&record, Mode::Transparent);
        let b = wrap(&record, Mode::Staged);
        let seen = Rc::new(Cell::new(0));
        for p in [&a, &b] {
            let seen = seen.clone();
            p.subscribe(move |_| seen.set(seen.get() + 1));
        }

        let event = persisted(&record, "first_name", Value::from("Arie"));
        let stats = ChangeBridge::new().reconcile(&event);

        assert_eq!(seen.get(), 2);
        assert_eq!(stats.notified, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(b.value("first_name").unwrap(), Value::from("Arie"));
    }

    #[test]
    fn test_dead_proxies_are_skipped() {
        let record = record();
        let live = wrap(&record, Mode::Transparent);
        drop(wrap(&record, Mode::Staged));
        assert_eq!(record.backrefs().len(), 2);

        let stats = ChangeBridge::new().reconcile(&persisted(&record, "age", Value::Int32(9)));

        assert_eq!(stats.notified, 1);
        assert_eq!(record.backrefs().len(), 1);
        assert_eq!(live.value("age").unwrap(), Value::Int32(9));
    }

    #[test]
    fn test_handler_writes_are_processed_once() {
        let record = record();
        let writer = wrap(&record, Mode::Transparent);
        let watcher = wrap(&record, Mode::Transparent);
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let watched: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));

        let handle = writer.clone();
        let sink = log.clone();
        writer.subscribe(move |change| {
            sink.borrow_mut().push(change.attribute.clone());
            if change.attribute == "first_name" {
                handle.write("age", 7).unwrap();
                handle.write("first_name", "again").unwrap();
            }
        });
        let sink = watched.clone();
        watcher.subscribe(move |change| sink.borrow_mut().push(change.new.clone()));

        let bridge = ChangeBridge::new();
        let stats = bridge.reconcile(&persisted(&record, "first_name", Value::from("Arie")));

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.notified, 3);
        assert_eq!(bridge.runs(), 1);
        assert_eq!(*log.borrow(), ["first_name", "age", "first_name"]);
        assert_eq!(
            *watched.borrow(),
            [Value::from("Arie"), Value::Int32(7)]
        );
    }

    #[test]
    fn test_persisted_value_settles_despite_handler_write() {
        let record = record();
        let watcher = wrap(&record, Mode::Transparent);
        let staged = wrap(&record, Mode::Staged);

        let handle = watcher.clone();
        watcher.subscribe(move |change| {
            if change.new == Value::from("Arie") {
                handle.write("first_name", "again").unwrap();
            }
        });

        staged.write("first_name", "Arie").unwrap();
        staged.flush().unwrap();
        let stats = ChangeBridge::new().reconcile(&persisted(&record, "first_name", Value::from("Arie")));

        assert_eq!(stats.settled, 1);
        assert_eq!(stats.kept, 0);
        assert!(!staged.has_changes());
        assert_eq!(record.get("first_name").unwrap(), Value::from("again"));
    }
}
