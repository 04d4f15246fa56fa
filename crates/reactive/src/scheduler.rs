//! Deferred calls on the UI actor.
//!
//! `CallQueue` models "run this after the current event has been handled".
//! The host drains it once per event-loop turn with [`CallQueue::run_pending`];
//! work queued while a turn runs is left for the next turn.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::cell::RefCell;

type Task = Box<dyn FnOnce()>;

/// FIFO queue of deferred continuations.
#[derive(Default)]
pub struct CallQueue {
    pending: RefCell<VecDeque<Task>>,
}

impl CallQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` for the next turn.
    pub fn call_after<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.pending.borrow_mut().push_back(Box::new(task));
    }

    /// Runs the tasks queued before this call. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let turn = core::mem::take(&mut *self.pending.borrow_mut());
        let ran = turn.len();
        for task in turn {
            task();
        }
        ran
    }

    /// Runs turns until the queue stays empty, at most `max_turns` times.
    pub fn run_until_idle(&self, max_turns: usize) -> usize {
        let mut ran = 0;
        for _ in 0..max_turns {
            if self.is_empty() {
                break;
            }
            ran += self.run_pending();
        }
        ran
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}
