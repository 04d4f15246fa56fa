//! Change-tracking proxies.
//!
//! A `Proxy` mirrors one record. In `Transparent` mode every write goes
//! straight to the record; in `Staged` mode writes are buffered per
//! attribute until `flush`. Either way each proxy raises an
//! `AttributeChange` whenever the value it shows for an attribute changes.
//!
//! Every proxy remembers the value it last published per attribute. That
//! snapshot is what keeps a write followed by the persistence layer
//! confirming the same value from notifying twice.

use crate::field::Field;
use crate::kind::{Mode, ProxyType};
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use hashbrown::HashMap;
use stagehand_core::{Error, Record, Result, Value};
use stagehand_reactive::{SubscriptionId, SubscriptionManager};

/// Notification raised when the value a proxy shows for an attribute changes.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeChange {
    pub attribute: String,
    pub old: Value,
    pub new: Value,
}

/// What reconciliation did to one proxy for one attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// The staged value was confirmed and dropped.
    Settled,
    /// A different value is staged; the staged edit is kept.
    StagedWins,
    /// Observers were told about the new value.
    Notified,
    /// The proxy already showed this value.
    Unchanged,
    /// The attribute is not reflected by this proxy type.
    Ignored,
}

pub(crate) struct ProxyInner {
    source: Record,
    kind: Rc<ProxyType>,
    staged: RefCell<BTreeMap<String, Field>>,
    published: RefCell<HashMap<String, Value>>,
    observers: RefCell<SubscriptionManager<AttributeChange>>,
}

/// A proxy over a record.
#[derive(Clone)]
pub struct Proxy(pub(crate) Rc<ProxyInner>);

impl Proxy {
    pub(crate) fn new(source: Record, kind: Rc<ProxyType>) -> Self {
        let published = kind
            .fields()
            .iter()
            .filter_map(|f| {
                source
                    .get_at(f.column())
                    .ok()
                    .map(|v| (f.name().to_string(), v))
            })
            .collect();

        Proxy(Rc::new(ProxyInner {
            source,
            kind,
            staged: RefCell::new(BTreeMap::new()),
            published: RefCell::new(published),
            observers: RefCell::new(SubscriptionManager::new()),
        }))
    }

    /// The wrapped record.
    #[inline]
    pub fn source(&self) -> &Record {
        &self.0.source
    }

    /// The shared proxy type.
    #[inline]
    pub fn kind(&self) -> &Rc<ProxyType> {
        &self.0.kind
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.0.kind.mode()
    }

    /// Returns true if both handles are the same proxy (not merely equal).
    #[inline]
    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn check_attribute(&self, attribute: &str) -> Result<()> {
        if self.0.kind.has_field(attribute) {
            Ok(())
        } else {
            Err(Error::unknown_attribute(self.0.kind.name(), attribute))
        }
    }

    /// Reads an attribute: the staged value if there is one, else the record's.
    pub fn read(&self, attribute: &str) -> Result<Field> {
        self.check_attribute(attribute)?;
        if let Some(field) = self.0.staged.borrow().get(attribute) {
            return Ok(field.clone());
        }
        Ok(Field::Value(self.0.source.get(attribute)?))
    }

    /// Reads an attribute as a plain value.
    pub fn value(&self, attribute: &str) -> Result<Value> {
        Ok(self.read(attribute)?.to_value())
    }

    /// Writes an attribute and notifies observers if the shown value changed.
    ///
    /// Transparent proxies write the record immediately; staged proxies only
    /// buffer the value.
    pub fn write(&self, attribute: &str, value: impl Into<Field>) -> Result<()> {
        self.check_attribute(attribute)?;
        let field = value.into();
        let new = field.to_value();

        match self.mode() {
            Mode::Transparent => self.0.source.set(attribute, new.clone())?,
            Mode::Staged => {
                let column = self
                    .0
                    .source
                    .schema()
                    .get_column(attribute)
                    .ok_or_else(|| Error::unknown_attribute(self.0.kind.name(), attribute))?;
                if !column.accepts(&new) {
                    let got = new.data_type().unwrap_or(column.data_type());
                    return Err(Error::type_mismatch(column.data_type(), got));
                }
                self.0
                    .staged
                    .borrow_mut()
                    .insert(attribute.to_string(), field);
            }
        }

        self.publish(attribute, new);
        Ok(())
    }

    /// Writes every staged value to the record. Does not clear the stage.
    pub fn flush(&self) -> Result<()> {
        if self.mode() == Mode::Transparent {
            return Ok(());
        }
        let staged: Vec<(String, Value)> = self
            .0
            .staged
            .borrow()
            .iter()
            .map(|(k, f)| (k.clone(), f.to_value()))
            .collect();
        tracing::debug!(
            proxy_type = self.0.kind.name(),
            record = self.0.source.id(),
            attributes = staged.len(),
            "flushing staged changes"
        );
        for (attribute, value) in staged {
            self.0.source.set(&attribute, value)?;
        }
        Ok(())
    }

    /// True if anything is staged. Always false for transparent proxies.
    pub fn has_changes(&self) -> bool {
        !self.0.staged.borrow().is_empty()
    }

    /// Snapshot of the staged values, by attribute name.
    pub fn changes(&self) -> Vec<(String, Field)> {
        self.0
            .staged
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Drops every staged value.
    ///
    /// Attributes whose record value differs from what the proxy showed are
    /// re-published, so observers see the proxy fall back to the record.
    pub fn clear_changes(&self) {
        let cleared = core::mem::take(&mut *self.0.staged.borrow_mut());
        for attribute in cleared.keys() {
            if let Ok(value) = self.0.source.get(attribute) {
                self.publish(attribute, value);
            }
        }
    }

    /// Subscribes to attribute changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AttributeChange) + 'static,
    {
        self.0.observers.borrow_mut().subscribe(callback)
    }

    /// Unsubscribes by ID.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.observers.borrow_mut().unsubscribe(id)
    }

    /// Number of attribute observers.
    pub fn observer_count(&self) -> usize {
        self.0.observers.borrow().len()
    }

    /// Reflected attribute names in column order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.0.kind.attribute_names().collect()
    }

    /// Records `new` as the shown value and notifies if it differs.
    fn publish(&self, attribute: &str, new: Value) {
        let old = self
            .0
            .published
            .borrow_mut()
            .insert(attribute.to_string(), new.clone())
            .unwrap_or(Value::Null);
        if old == new {
            return;
        }

        let change = AttributeChange {
            attribute: attribute.to_string(),
            old,
            new,
        };
        let callbacks = self.0.observers.borrow().callbacks();
        for callback in callbacks {
            callback(&change);
        }
    }

    /// Applies a value the persistence layer confirmed for `attribute`.
    pub(crate) fn reconcile(&self, attribute: &str, value: &Value) -> Reconciled {
        if !self.0.kind.has_field(attribute) {
            return Reconciled::Ignored;
        }

        if self.mode() == Mode::Staged {
            let staged = self
                .0
                .staged
                .borrow()
                .get(attribute)
                .map(|f| f.to_value());
            match staged {
                Some(ref v) if v == value => {
                    self.0.staged.borrow_mut().remove(attribute);
                    self.0
                        .published
                        .borrow_mut()
                        .insert(attribute.to_string(), value.clone());
                    return Reconciled::Settled;
                }
                Some(_) => return Reconciled::StagedWins,
                None => {}
            }
        }

        let unchanged = self.0.published.borrow().get(attribute) == Some(value);
        if unchanged {
            Reconciled::Unchanged
        } else {
            self.publish(attribute, value.clone());
            Reconciled::Notified
        }
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.0.source == other.0.source
    }
}

impl PartialEq<Record> for Proxy {
    fn eq(&self, other: &Record) -> bool {
        self.0.source == *other
    }
}

impl PartialEq<Proxy> for Record {
    fn eq(&self, other: &Proxy) -> bool {
        *self == other.0.source
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}#{})",
            self.0.kind.name(),
            self.0.source.type_name(),
            self.0.source.id()
        )
    }
}
