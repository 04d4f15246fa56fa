//! Stagehand Reactive - notification plumbing for the UI actor.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`) and never keeps an
//! internal borrow while user callbacks run, so callbacks may freely
//! re-enter the object that notified them.
//!
//! # Core Concepts
//!
//! - `SubscriptionManager<E>`: callback registry for events of type `E`
//! - `Observable<T>`: value cell that notifies on every assignment
//! - `FlushRegistry`: routes persistence flush events by record type
//! - `CallQueue`: continuations deferred to the next event-loop turn
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use stagehand_reactive::Observable;
//!
//! let page = Observable::new(0usize);
//! let seen = Rc::new(Cell::new(0));
//! let seen_clone = seen.clone();
//! page.subscribe(move |p| seen_clone.set(*p));
//!
//! page.set(3);
//! assert_eq!(seen.get(), 3);
//! ```

#![no_std]

extern crate alloc;

pub mod notify;
pub mod observable;
pub mod scheduler;
pub mod subscription;

pub use notify::FlushRegistry;
pub use observable::Observable;
pub use scheduler::CallQueue;
pub use subscription::{Callback, Subscription, SubscriptionId, SubscriptionManager};
