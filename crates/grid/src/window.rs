//! Windowed row cache over a counted, sliceable query.
//!
//! The cache answers `row_count` from the query's count and materializes rows
//! lazily: a miss at `i` fetches `[i - page_size, i + page_size)` (clipped to
//! the result) and wraps every record in a staged proxy. Positions already
//! cached are never overwritten by a later overlapping fetch.
//!
//! The query lives in an `Observable`. Assigning a new query drops every
//! cached row, recounts, and tells dependents that the whole view was
//! replaced.

use crate::table::RowSource;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use stagehand_core::{Error, QueryHandle, RecordState, Result};
use stagehand_proxy::{Mode, Proxy, ProxyFactory};
use stagehand_reactive::{Observable, SubscriptionId, SubscriptionManager};

/// Structural change announced to views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewChange {
    /// Every row may have changed; `rows` is the new row count.
    Reset { rows: usize },
}

#[derive(Default)]
struct WindowState {
    total: usize,
    rows: BTreeMap<usize, Proxy>,
    fetches: usize,
}

/// Lazily paged, index-addressable view over a query.
pub struct WindowedCache {
    query: Rc<Observable<QueryHandle>>,
    factory: Rc<ProxyFactory>,
    page_size: usize,
    state: RefCell<WindowState>,
    listeners: RefCell<SubscriptionManager<ViewChange>>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl WindowedCache {
    /// Creates a cache following `query`, counting its first result set.
    pub fn new(
        query: Rc<Observable<QueryHandle>>,
        factory: Rc<ProxyFactory>,
        page_size: usize,
    ) -> Result<Rc<Self>> {
        let total = query.get().count()?;
        let cache = Rc::new(Self {
            query: query.clone(),
            factory,
            page_size: page_size.max(1),
            state: RefCell::new(WindowState {
                total,
                ..WindowState::default()
            }),
            listeners: RefCell::new(SubscriptionManager::new()),
            subscription: Cell::new(None),
        });

        let weak: Weak<Self> = Rc::downgrade(&cache);
        let id = query.subscribe(move |_| {
            if let Some(cache) = weak.upgrade() {
                if let Err(err) = cache.refresh() {
                    tracing::warn!(error = %err, "row cache refresh failed");
                }
            }
        });
        cache.subscription.set(Some(id));
        Ok(cache)
    }

    /// The observable query this cache follows.
    pub fn query(&self) -> &Rc<Observable<QueryHandle>> {
        &self.query
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of rows in the result, locally appended rows included.
    pub fn row_count(&self) -> usize {
        self.state.borrow().total
    }

    /// Returns the proxy at `index`, fetching its window on a miss.
    pub fn get_row(&self, index: usize) -> Result<Proxy> {
        let total = self.row_count();
        if index >= total {
            return Err(Error::out_of_range(index, total));
        }
        if let Some(row) = self.state.borrow().rows.get(&index) {
            tracing::trace!(index, "row cache hit");
            return Ok(row.clone());
        }

        self.fetch_around(index, total)?;
        self.state
            .borrow()
            .rows
            .get(&index)
            .cloned()
            .ok_or_else(|| Error::out_of_range(index, total))
    }

    fn fetch_around(&self, index: usize, total: usize) -> Result<()> {
        let start = index.saturating_sub(self.page_size);
        let stop = total.min(index + self.page_size);
        let records = self.query.get().slice(start, stop)?;

        let mut fetched = Vec::with_capacity(records.len());
        for record in &records {
            fetched.push(self.factory.wrap(Some(record), Mode::Staged)?);
        }

        let mut state = self.state.borrow_mut();
        state.fetches += 1;
        let mut inserted = 0;
        for (offset, proxy) in fetched.into_iter().enumerate() {
            if let alloc::collections::btree_map::Entry::Vacant(slot) =
                state.rows.entry(start + offset)
            {
                slot.insert(proxy);
                inserted += 1;
            }
        }
        tracing::debug!(start, stop, inserted, "fetched row window");
        Ok(())
    }

    /// Position of `row` among the cached rows.
    pub fn get_row_index(&self, row: &Proxy) -> Result<usize> {
        self.state
            .borrow()
            .rows
            .iter()
            .find(|(_, cached)| *cached == row)
            .map(|(&index, _)| index)
            .ok_or_else(|| Error::not_cached(format!("{:?}", row)))
    }

    /// Drops every cached row, recounts the current query and announces a reset.
    pub fn refresh(&self) -> Result<()> {
        let total = self.query.get().count()?;
        {
            let mut state = self.state.borrow_mut();
            state.rows.clear();
            state.total = total;
        }
        tracing::debug!(rows = total, "row cache reset");
        self.announce(ViewChange::Reset { rows: total });
        Ok(())
    }

    /// Like `refresh`, but keeps locally appended rows that are still unsaved,
    /// except those in `removed`. They are placed after the query's rows in
    /// their previous order.
    pub fn refresh_keeping_created(&self, removed: &[Proxy]) -> Result<()> {
        let total = self.query.get().count()?;
        let rows = {
            let mut state = self.state.borrow_mut();
            let kept: Vec<Proxy> = state
                .rows
                .values()
                .filter(|row| row.source().state() == RecordState::Transient)
                .filter(|row| !removed.iter().any(|r| r == *row))
                .cloned()
                .collect();
            state.rows.clear();
            state.total = total;
            for row in kept {
                let index = state.total;
                state.rows.insert(index, row);
                state.total += 1;
            }
            state.total
        };
        tracing::debug!(rows, created = rows - total, "row cache reset");
        self.announce(ViewChange::Reset { rows });
        Ok(())
    }

    /// Places a locally created row after the last one. Returns its position.
    ///
    /// The row is dropped again by the next `refresh` but survives
    /// `refresh_keeping_created` while it is unsaved.
    pub fn append_row(&self, row: Proxy) -> usize {
        let mut state = self.state.borrow_mut();
        let index = state.total;
        state.rows.insert(index, row);
        state.total += 1;
        index
    }

    /// Returns true if `index` is materialized.
    pub fn is_cached(&self, index: usize) -> bool {
        self.state.borrow().rows.contains_key(&index)
    }

    /// Number of materialized rows.
    pub fn cached_len(&self) -> usize {
        self.state.borrow().rows.len()
    }

    /// Number of slice fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.state.borrow().fetches
    }

    /// Snapshot of the materialized rows in position order.
    pub fn cached_rows(&self) -> Vec<(usize, Proxy)> {
        self.state
            .borrow()
            .rows
            .iter()
            .map(|(&i, row)| (i, row.clone()))
            .collect()
    }

    /// Subscribes to structural changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ViewChange) + 'static,
    {
        self.listeners.borrow_mut().subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().unsubscribe(id)
    }

    fn announce(&self, change: ViewChange) {
        let callbacks = self.listeners.borrow().callbacks();
        for callback in callbacks {
            callback(&change);
        }
    }
}

impl Drop for WindowedCache {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.query.unsubscribe(id);
        }
    }
}

impl RowSource for WindowedCache {
    fn row_count(&self) -> usize {
        WindowedCache::row_count(self)
    }

    fn get_row(&self, index: usize) -> Result<Proxy> {
        WindowedCache::get_row(self, index)
    }

    fn get_row_index(&self, row: &Proxy) -> Result<usize> {
        WindowedCache::get_row_index(self, row)
    }

    fn cached_rows(&self) -> Vec<(usize, Proxy)> {
        WindowedCache::cached_rows(self)
    }
}
