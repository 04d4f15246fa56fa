//! Proxy construction.

use crate::bridge::ChangeBridge;
use crate::field::Field;
use crate::kind::Mode;
use crate::proxy::Proxy;
use crate::registry::ProxyRegistry;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cell::RefCell;
use hashbrown::HashSet;
use stagehand_core::{ChangeFeed, Error, FlushEvent, Record, Result};

/// Builds proxies and keeps their change bridge subscribed.
///
/// One factory is shared (by `Rc`) by everything that wraps records for a
/// given persistence layer. It owns the proxy type registry and subscribes
/// the bridge to the feed once per record type, on first wrap.
pub struct ProxyFactory {
    feed: Option<Rc<dyn ChangeFeed>>,
    registry: ProxyRegistry,
    bridge: Rc<ChangeBridge>,
    subscribed: RefCell<HashSet<String>>,
}

impl ProxyFactory {
    /// Creates a factory reconciling proxies against `feed`.
    pub fn new(feed: Rc<dyn ChangeFeed>) -> Self {
        Self {
            feed: Some(feed),
            registry: ProxyRegistry::new(),
            bridge: Rc::new(ChangeBridge::new()),
            subscribed: RefCell::new(HashSet::new()),
        }
    }

    /// Creates a factory with no persistence feed. Proxies are never reconciled.
    pub fn detached() -> Self {
        Self {
            feed: None,
            registry: ProxyRegistry::new(),
            bridge: Rc::new(ChangeBridge::new()),
            subscribed: RefCell::new(HashSet::new()),
        }
    }

    /// Wraps `source` in a new proxy.
    ///
    /// Every call returns a new proxy; proxies of the same record compare
    /// equal and share one proxy type per mode.
    pub fn wrap(&self, source: Option<&Record>, mode: Mode) -> Result<Proxy> {
        let source = source.ok_or_else(Error::null_source)?;
        let kind = self.registry.get_or_create(source.schema(), mode);
        self.ensure_subscribed(source.type_name());

        let proxy = Proxy::new(source.clone(), kind);
        source.backrefs().attach(&proxy.0);
        tracing::trace!(proxy = ?proxy, "wrapped");
        Ok(proxy)
    }

    /// Wraps whatever record `value` holds, unwrapping proxies first.
    pub fn rewrap(&self, value: &Field, mode: Mode) -> Result<Proxy> {
        self.wrap(value.as_record().as_ref(), mode)
    }

    fn ensure_subscribed(&self, source_type: &str) {
        let Some(feed) = &self.feed else {
            return;
        };
        if !self.subscribed.borrow_mut().insert(source_type.to_string()) {
            return;
        }

        let bridge = self.bridge.clone();
        feed.listen(
            source_type,
            Rc::new(move |event: &FlushEvent| {
                bridge.reconcile(event);
            }),
        );
        tracing::debug!(source_type, "change bridge subscribed");
    }

    /// Returns true once the bridge listens for `source_type`.
    pub fn is_subscribed(&self, source_type: &str) -> bool {
        self.subscribed.borrow().contains(source_type)
    }

    #[inline]
    pub fn registry(&self) -> &ProxyRegistry {
        &self.registry
    }

    #[inline]
    pub fn bridge(&self) -> &ChangeBridge {
        &self.bridge
    }
}
