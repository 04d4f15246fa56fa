//! Observable value cells.
//!
//! An `Observable<T>` holds one value and notifies its subscribers every time
//! a new value is set, equal or not. Grids use it for the query descriptor:
//! each assignment invalidates everything derived from the previous query.

use crate::subscription::{SubscriptionId, SubscriptionManager};
use core::cell::RefCell;

/// A value cell with change notification.
pub struct Observable<T> {
    value: RefCell<T>,
    subscriptions: RefCell<SubscriptionManager<T>>,
}

impl<T: Clone + 'static> Observable<T> {
    /// Creates an observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            subscriptions: RefCell::new(SubscriptionManager::new()),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replaces the value and notifies every subscriber with the new value.
    ///
    /// Subscribers may read or set the observable again; they run after all
    /// internal borrows are released.
    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value.clone();
        let callbacks = self.subscriptions.borrow().callbacks();
        for callback in callbacks {
            callback(&value);
        }
    }

    /// Subscribes to value changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        self.subscriptions.borrow_mut().subscribe(callback)
    }

    /// Unsubscribes by ID.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow_mut().unsubscribe(id)
    }

    /// Returns the number of subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}
