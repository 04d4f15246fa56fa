//! Grid view models.
//!
//! A `GridModel` owns the rows a grid shows (an in-memory list or a windowed
//! query), saves staged row edits through the unit of work, deletes and
//! creates rows, and narrows a query-backed model by search text. Failures
//! at a commit boundary are rolled back and handed to the error reporter;
//! the staged edits stay on their proxies so the user can correct them.

use crate::commit::{CommitTarget, SaveReport, Unit};
use crate::config::GridConfig;
use crate::report::{ErrorReporter, Failure};
use crate::table::{ColumnSpec, GridTable, ListTable, RowSource};
use crate::window::WindowedCache;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use stagehand_core::pattern_match::contains_pattern;
use stagehand_core::schema::Table;
use stagehand_core::{Error, QueryHandle, Record, RecordState, Result, UnitOfWork};
use stagehand_proxy::{Mode, Proxy, ProxyFactory};
use stagehand_reactive::{Observable, SubscriptionId, SubscriptionManager};

/// The collaborators a model commits through.
#[derive(Clone)]
pub struct ModelContext {
    pub factory: Rc<ProxyFactory>,
    pub unit: Rc<dyn UnitOfWork>,
    pub reporter: Rc<dyn ErrorReporter>,
}

impl ModelContext {
    pub fn new(
        factory: Rc<ProxyFactory>,
        unit: Rc<dyn UnitOfWork>,
        reporter: Rc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            factory,
            unit,
            reporter,
        }
    }

    /// Rolls back the unit of work and reports `err`.
    pub(crate) fn fail(&self, err: Error) {
        self.unit.rollback();
        tracing::warn!(error = %err, "rolled back");
        self.reporter.report(Failure::database(err));
    }
}

/// Notifications raised by a grid model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelEvent {
    /// Rows were created or deleted; `rows` is the new count.
    RowCountChanged { rows: usize },
    /// The query changed; every row may be different.
    Reset,
}

enum Rows {
    List(Rc<ListTable>),
    Query {
        query: Rc<Observable<QueryHandle>>,
        base: QueryHandle,
        cache: Rc<WindowedCache>,
    },
}

/// View model behind a grid of records of one type.
pub struct GridModel {
    ctx: ModelContext,
    schema: Rc<Table>,
    config: GridConfig,
    columns: Vec<ColumnSpec>,
    title: String,
    search_attribute: Option<String>,
    rows: Rows,
    pending: RefCell<Vec<Proxy>>,
    events: RefCell<SubscriptionManager<ModelEvent>>,
}

impl GridModel {
    fn with_rows(
        ctx: ModelContext,
        schema: Rc<Table>,
        columns: Vec<ColumnSpec>,
        config: GridConfig,
        rows: Rows,
    ) -> Self {
        let title = format!("{}s", schema.name());
        Self {
            ctx,
            schema,
            config,
            columns,
            title,
            search_attribute: None,
            rows,
            pending: RefCell::new(Vec::new()),
            events: RefCell::new(SubscriptionManager::new()),
        }
    }

    /// A model over a fixed list of records, each wrapped in a staged proxy.
    pub fn from_list(
        ctx: ModelContext,
        schema: Rc<Table>,
        records: &[Record],
        columns: Vec<ColumnSpec>,
        config: GridConfig,
    ) -> Result<Self> {
        let proxies = records
            .iter()
            .map(|r| ctx.factory.wrap(Some(r), Mode::Staged))
            .collect::<Result<Vec<_>>>()?;
        let rows = Rows::List(Rc::new(ListTable::new(proxies)));
        Ok(Self::with_rows(ctx, schema, columns, config, rows))
    }

    /// A model paging through `query` with a windowed cache.
    pub fn from_query(
        ctx: ModelContext,
        schema: Rc<Table>,
        query: QueryHandle,
        columns: Vec<ColumnSpec>,
        config: GridConfig,
    ) -> Result<Self> {
        let observable = Rc::new(Observable::new(query.clone()));
        let cache = WindowedCache::new(observable.clone(), ctx.factory.clone(), config.page_size)?;
        let rows = Rows::Query {
            query: observable,
            base: query,
            cache,
        };
        Ok(Self::with_rows(ctx, schema, columns, config, rows))
    }

    /// Sets the attribute `search` filters on.
    pub fn with_search(mut self, attribute: impl Into<String>) -> Self {
        self.search_attribute = Some(attribute.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Window title; the record type name plus "s" unless set.
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[inline]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[inline]
    pub fn schema(&self) -> &Rc<Table> {
        &self.schema
    }

    /// The rows as a generic row source.
    pub fn source(&self) -> Rc<dyn RowSource> {
        match &self.rows {
            Rows::List(list) => list.clone() as Rc<dyn RowSource>,
            Rows::Query { cache, .. } => cache.clone() as Rc<dyn RowSource>,
        }
    }

    /// The windowed cache of a query-backed model.
    pub fn cache(&self) -> Option<&Rc<WindowedCache>> {
        match &self.rows {
            Rows::List(_) => None,
            Rows::Query { cache, .. } => Some(cache),
        }
    }

    /// Cell access through this model's column mapping.
    pub fn table(&self) -> GridTable<dyn RowSource> {
        GridTable::new(self.source(), self.columns.clone())
    }

    pub fn row_count(&self) -> usize {
        self.source().row_count()
    }

    pub fn row(&self, index: usize) -> Result<Proxy> {
        self.source().get_row(index)
    }

    /// Proxies saved but not yet committed (`autocommit` off).
    pub fn pending_commits(&self) -> Vec<Proxy> {
        self.pending.borrow().clone()
    }

    /// Flushes `row` and commits it, or queues it when `autocommit` is off.
    ///
    /// Returns false after rolling back and reporting a failure.
    pub fn save(&self, row: &Proxy) -> bool {
        if let Err(err) = row.flush() {
            self.ctx.fail(err);
            return false;
        }
        if !self.config.autocommit {
            let mut pending = self.pending.borrow_mut();
            if !pending.iter().any(|p| p.ptr_eq(row)) {
                pending.push(row.clone());
            }
            return true;
        }
        match self.commit_row(row) {
            Ok(()) => true,
            Err(err) => {
                self.ctx.fail(err);
                false
            }
        }
    }

    /// Adds the row's record to the unit of work and commits it.
    pub fn commit_row(&self, row: &Proxy) -> Result<()> {
        self.ctx.unit.add(row.source())?;
        self.ctx.unit.commit()?;
        row.clear_changes();
        tracing::debug!(row = ?row, "row committed");
        Ok(())
    }

    /// Commits every queued row. Failed rows stay queued.
    pub fn commit_pending(&self) -> SaveReport {
        let queued = core::mem::take(&mut *self.pending.borrow_mut());
        let mut report = SaveReport::default();
        let mut still_pending = Vec::new();
        for row in queued {
            // Flush again: rolling back an earlier failure reverts records.
            let committed = row.flush().and_then(|()| self.commit_row(&row));
            match committed {
                Ok(()) => report.saved += 1,
                Err(err) => {
                    self.ctx.fail(err);
                    if let Ok(index) = self.source().get_row_index(&row) {
                        report.failed_rows.push(index);
                    }
                    still_pending.push(row);
                }
            }
        }
        self.pending.borrow_mut().extend(still_pending);
        report
    }

    /// Deletes `rows` in one unit of work.
    ///
    /// On success the rows leave a list source, or a query source is
    /// refreshed. On failure nothing is removed.
    pub fn delete_rows(&self, rows: &[Proxy]) -> bool {
        let deleted = rows
            .iter()
            .try_for_each(|row| self.schedule_delete(row.source()))
            .and_then(|()| self.ctx.unit.commit());
        if let Err(err) = deleted {
            self.ctx.fail(err);
            return false;
        }

        self.pending
            .borrow_mut()
            .retain(|p| !rows.iter().any(|r| r == p));
        match &self.rows {
            Rows::List(list) => {
                for row in rows {
                    list.remove(row);
                }
            }
            Rows::Query { cache, .. } => {
                if let Err(err) = cache.refresh_keeping_created(rows) {
                    tracing::warn!(error = %err, "refresh after delete failed");
                }
            }
        }
        tracing::debug!(count = rows.len(), "rows deleted");
        self.emit(ModelEvent::RowCountChanged {
            rows: self.row_count(),
        });
        true
    }

    fn schedule_delete(&self, record: &Record) -> Result<()> {
        match self.ctx.unit.delete(record) {
            // Created here and never saved: nothing to delete.
            Err(Error::NotPending { .. }) if record.state() == RecordState::Transient => Ok(()),
            other => other,
        }
    }

    /// Appends a new, unsaved record wrapped in a staged proxy.
    pub fn create_row(&self) -> Result<Proxy> {
        let record = Record::new(self.schema.clone());
        let row = self.ctx.factory.wrap(Some(&record), Mode::Staged)?;
        let index = match &self.rows {
            Rows::List(list) => list.push(row.clone()),
            Rows::Query { cache, .. } => cache.append_row(row.clone()),
        };
        tracing::debug!(index, "row created");
        self.emit(ModelEvent::RowCountChanged {
            rows: self.row_count(),
        });
        Ok(row)
    }

    /// Narrows a query-backed model to rows whose search attribute contains
    /// `text`. Empty text restores the unfiltered query.
    pub fn search(&self, text: &str) -> Result<()> {
        let Rows::Query { query, base, .. } = &self.rows else {
            return Err(Error::invalid_operation("Search needs a query-backed model"));
        };
        if text.is_empty() {
            query.set(base.clone());
        } else {
            let attribute = self
                .search_attribute
                .as_deref()
                .ok_or_else(|| Error::invalid_operation("No search attribute configured"))?;
            query.set(base.filter_like(attribute, &contains_pattern(text))?);
        }
        tracing::debug!(text, rows = self.row_count(), "search");
        self.emit(ModelEvent::Reset);
        Ok(())
    }

    /// Subscribes to model events.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ModelEvent) + 'static,
    {
        self.events.borrow_mut().subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.borrow_mut().unsubscribe(id)
    }

    fn emit(&self, event: ModelEvent) {
        let callbacks = self.events.borrow().callbacks();
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Cached rows belonging to `unit` that hold staged edits.
    fn dirty_rows(&self, unit: Unit) -> Vec<(usize, Proxy)> {
        let source = self.source();
        match unit {
            Unit::Cell(pos) => source
                .get_row(pos.row)
                .ok()
                .filter(|r| r.has_changes())
                .map(|r| (pos.row, r))
                .into_iter()
                .collect(),
            Unit::Row(index) => source
                .get_row(index)
                .ok()
                .filter(|r| r.has_changes())
                .map(|r| (index, r))
                .into_iter()
                .collect(),
            Unit::Column(col) => {
                let Some(column) = self.columns.get(col) else {
                    return Vec::new();
                };
                source
                    .cached_rows()
                    .into_iter()
                    .filter(|(_, r)| {
                        r.changes()
                            .iter()
                            .any(|(attribute, _)| *attribute == column.attribute)
                    })
                    .collect()
            }
            Unit::Table => source
                .cached_rows()
                .into_iter()
                .filter(|(_, r)| r.has_changes())
                .collect(),
        }
    }
}

impl CommitTarget for GridModel {
    fn has_changes(&self, unit: Unit) -> bool {
        !self.dirty_rows(unit).is_empty()
    }

    fn commit(&self, unit: Unit) -> bool {
        let mut ok = true;
        for (_, row) in self.dirty_rows(unit) {
            ok &= self.save(&row);
        }
        ok
    }

    /// Saves every dirty row. Without autocommit the queued rows are
    /// committed too, so `saved` only counts persisted rows.
    fn commit_all(&self) -> SaveReport {
        let mut report = SaveReport::default();
        for (index, row) in self.dirty_rows(Unit::Table) {
            if !self.save(&row) {
                report.failed_rows.push(index);
            } else if self.config.autocommit {
                report.saved += 1;
            }
        }
        if !self.config.autocommit {
            let queued = self.commit_pending();
            report.saved += queued.saved;
            report.failed_rows.extend(queued.failed_rows);
            report.failed_rows.sort_unstable();
            report.failed_rows.dedup();
        }
        report
    }
}
