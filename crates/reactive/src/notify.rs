//! Flush listener registry.
//!
//! `FlushRegistry` routes post-commit flush events to the listeners
//! registered for each record type. A persistence layer owns one registry
//! and calls [`FlushRegistry::dispatch`] after every successful commit.

use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use stagehand_core::{FlushEvent, FlushListener};

/// Per record type flush listeners.
#[derive(Default)]
pub struct FlushRegistry {
    listeners: RefCell<HashMap<String, SubscriptionManager<FlushEvent>>>,
}

impl FlushRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for flushes touching `source_type`.
    pub fn listen(&self, source_type: &str, listener: FlushListener) -> SubscriptionId {
        self.listeners
            .borrow_mut()
            .entry(source_type.to_string())
            .or_default()
            .subscribe_rc(listener)
    }

    /// Removes a listener.
    ///
    /// Returns true if the listener was found and removed.
    pub fn unlisten(&self, source_type: &str, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let removed = listeners
            .get_mut(source_type)
            .map(|m| m.unsubscribe(id))
            .unwrap_or(false);
        listeners.retain(|_, m| !m.is_empty());
        removed
    }

    /// Delivers `event` to the listeners of every record type it touches.
    ///
    /// Each listener receives only the changes for its type. Listeners run
    /// with the registry unborrowed, so they may register further listeners.
    pub fn dispatch(&self, event: &FlushEvent) {
        for source_type in event.source_types() {
            let callbacks = match self.listeners.borrow().get(source_type) {
                Some(manager) => manager.callbacks(),
                None => Vec::new(),
            };
            if callbacks.is_empty() {
                continue;
            }

            let scoped = event.for_type(source_type);
            tracing::trace!(
                source_type,
                records = scoped.len(),
                listeners = callbacks.len(),
                "dispatching flush event"
            );
            for callback in callbacks {
                callback(&scoped);
            }
        }
    }

    /// Number of listeners registered for `source_type`.
    pub fn listener_count(&self, source_type: &str) -> usize {
        self.listeners
            .borrow()
            .get(source_type)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Clears all listeners.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use stagehand_core::schema::TableBuilder;
    use stagehand_core::{DataType, Record, RecordChanges, Value};

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

    fn event(records: &[&Record]) -> FlushEvent {
        FlushEvent::new(
            records
                .iter()
                .map(|r| RecordChanges::new((*r).clone(), vec![("name".into(), Value::from("x"))]))
                .collect(),
        )
    }

    #[test]
    fn test_dispatch_routes_by_type() {
        let registry = FlushRegistry::new();
        let skaters = Rc::new(RefCell::new(0usize));
        let clubs = Rc::new(RefCell::new(0usize));

        let s = skaters.clone();
        registry.listen("skater", Rc::new(move |e: &FlushEvent| *s.borrow_mut() += e.len()));
        let c = clubs.clone();
        registry.listen("club", Rc::new(move |e: &FlushEvent| *c.borrow_mut() += e.len()));

        let a = record("skater");
        let b = record("skater");
        let club = record("club");
        registry.dispatch(&event(&[&a, &club, &b]));

        assert_eq!(*skaters.borrow(), 2);
        assert_eq!(*clubs.borrow(), 1);
    }

    #[test]
    fn test_unlisten() {
        let registry = FlushRegistry::new();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let id = registry.listen("skater", Rc::new(move |_: &FlushEvent| *c.borrow_mut() += 1));
        assert_eq!(registry.listener_count("skater"), 1);

        assert!(registry.unlisten("skater", id));
        assert!(registry.is_empty());
        registry.dispatch(&event(&[&record("skater")]));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_listener_may_register_during_dispatch() {
        let registry = Rc::new(FlushRegistry::new());
        let reg = registry.clone();
        registry.listen(
            "skater",
            Rc::new(move |_: &FlushEvent| {
                reg.listen("skater", Rc::new(|_: &FlushEvent| {}));
            }),
        );

        registry.dispatch(&event(&[&record("skater")]));
        assert_eq!(registry.listener_count("skater"), 2);
    }
}
