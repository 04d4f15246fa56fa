//! Registry of proxy types.

use crate::kind::{Mode, ProxyType};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cell::RefCell;
use hashbrown::HashMap;
use stagehand_core::schema::Table;

/// Caches exactly one `ProxyType` per (record type, mode).
#[derive(Default)]
pub struct ProxyRegistry {
    types: RefCell<HashMap<(String, Mode), Rc<ProxyType>>>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the proxy type for `(schema, mode)`, reflecting it on first use.
    pub fn get_or_create(&self, schema: &Table, mode: Mode) -> Rc<ProxyType> {
        let key = (schema.name().to_string(), mode);
        if let Some(kind) = self.types.borrow().get(&key) {
            return kind.clone();
        }

        let kind = Rc::new(ProxyType::reflect(schema, mode));
        tracing::debug!(
            proxy_type = kind.name(),
            fields = kind.fields().len(),
            "reflected proxy type"
        );
        self.types.borrow_mut().insert(key, kind.clone());
        kind
    }

    /// Returns an already created proxy type.
    pub fn get(&self, source_type: &str, mode: Mode) -> Option<Rc<ProxyType>> {
        self.types
            .borrow()
            .get(&(source_type.to_string(), mode))
            .cloned()
    }

    /// Number of proxy types created so far.
    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.borrow().is_empty()
    }
}
