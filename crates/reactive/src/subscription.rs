//! Subscription management.
//!
//! `SubscriptionManager<E>` hands out subscription ids and stores the
//! callbacks interested in events of type `E`. Callbacks are reference
//! counted so that owners can snapshot them, release their own borrows and
//! only then invoke them; a callback may therefore subscribe, unsubscribe or
//! trigger another notification without a `RefCell` conflict.

use alloc::rc::Rc;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for event notifications.
pub type Callback<E> = Rc<dyn Fn(&E)>;

/// A single subscription.
pub struct Subscription<E: ?Sized> {
    id: SubscriptionId,
    callback: Callback<E>,
    active: bool,
}

impl<E: ?Sized> Subscription<E> {
    /// Creates a new subscription.
    pub fn new(id: SubscriptionId, callback: Callback<E>) -> Self {
        Self {
            id,
            callback,
            active: true,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether this subscription is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivates this subscription.
    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Notifies this subscription.
    pub fn notify(&self, event: &E) {
        if self.active {
            (self.callback)(event);
        }
    }
}

/// Manages the subscriptions for one event source.
pub struct SubscriptionManager<E: ?Sized> {
    subscriptions: HashMap<SubscriptionId, Subscription<E>>,
    next_id: SubscriptionId,
}

impl<E: ?Sized> Default for SubscriptionManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> SubscriptionManager<E> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes with the given callback.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + 'static,
    {
        self.subscribe_rc(Rc::new(callback))
    }

    /// Subscribes with an already shared callback.
    pub fn subscribe_rc(&mut self, callback: Callback<E>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, callback));
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Deactivates a subscription without removing it.
    pub fn deactivate(&mut self, id: SubscriptionId) -> bool {
        match self.subscriptions.get_mut(&id) {
            Some(sub) => {
                sub.deactivate();
                true
            }
            None => false,
        }
    }

    /// Notifies all active subscriptions, in subscription order.
    ///
    /// Only usable when the manager is not behind a borrow that a callback
    /// might need; otherwise snapshot with [`callbacks`](Self::callbacks).
    pub fn notify_all(&self, event: &E) {
        for callback in self.callbacks() {
            callback(event);
        }
    }

    /// Snapshot of the active callbacks, in subscription order.
    pub fn callbacks(&self) -> Vec<Callback<E>> {
        let mut subs: Vec<&Subscription<E>> =
            self.subscriptions.values().filter(|s| s.is_active()).collect();
        subs.sort_by_key(|s| s.id());
        subs.into_iter().map(|s| s.callback.clone()).collect()
    }

    /// Returns the number of subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Returns all subscription IDs.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self.subscriptions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}
