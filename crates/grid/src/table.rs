//! Row sources and the cell-level table a grid view reads from.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use stagehand_core::{Error, Result, Value};
use stagehand_proxy::{Field, Proxy};

/// Position-addressable rows of proxies.
pub trait RowSource {
    fn row_count(&self) -> usize;

    fn get_row(&self, index: usize) -> Result<Proxy>;

    /// Reverse lookup by proxy equality.
    fn get_row_index(&self, row: &Proxy) -> Result<usize>;

    /// Rows currently materialized, in position order.
    fn cached_rows(&self) -> Vec<(usize, Proxy)>;
}

/// A row source over an in-memory list.
#[derive(Default)]
pub struct ListTable {
    rows: RefCell<Vec<Proxy>>,
}

impl ListTable {
    pub fn new(rows: Vec<Proxy>) -> Self {
        Self {
            rows: RefCell::new(rows),
        }
    }

    pub fn push(&self, row: Proxy) -> usize {
        let mut rows = self.rows.borrow_mut();
        rows.push(row);
        rows.len() - 1
    }

    /// Inserts at `index`, clamped to the end of the list.
    pub fn insert(&self, index: usize, row: Proxy) {
        let mut rows = self.rows.borrow_mut();
        let index = index.min(rows.len());
        rows.insert(index, row);
    }

    /// Removes the first row equal to `row`. Returns its former position.
    pub fn remove(&self, row: &Proxy) -> Option<usize> {
        let mut rows = self.rows.borrow_mut();
        let index = rows.iter().position(|r| r == row)?;
        rows.remove(index);
        Some(index)
    }

    pub fn rows(&self) -> Vec<Proxy> {
        self.rows.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }
}

impl RowSource for ListTable {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn get_row(&self, index: usize) -> Result<Proxy> {
        let rows = self.rows.borrow();
        rows.get(index)
            .cloned()
            .ok_or_else(|| Error::out_of_range(index, rows.len()))
    }

    fn get_row_index(&self, row: &Proxy) -> Result<usize> {
        self.rows
            .borrow()
            .iter()
            .position(|r| r == row)
            .ok_or_else(|| {
                Error::not_found(
                    row.source().type_name(),
                    Value::Record(row.source().clone()),
                )
            })
    }

    fn cached_rows(&self) -> Vec<(usize, Proxy)> {
        self.rows.borrow().iter().cloned().enumerate().collect()
    }
}

/// Renders a cell of a row as text.
pub type DisplayFn = Rc<dyn Fn(&Proxy) -> Result<String>>;

/// Maps one grid column to a record attribute.
#[derive(Clone)]
pub struct ColumnSpec {
    pub attribute: String,
    pub label: String,
    pub width: Option<u32>,
    /// Replaces the attribute's own display text when set.
    pub display: Option<DisplayFn>,
}

impl ColumnSpec {
    pub fn new(attribute: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            label: label.into(),
            width: None,
            display: None,
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Shows cells of this column through `display` instead of the raw value.
    pub fn display<F>(mut self, display: F) -> Self
    where
        F: Fn(&Proxy) -> Result<String> + 'static,
    {
        self.display = Some(Rc::new(display));
        self
    }
}

impl core::fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("attribute", &self.attribute)
            .field("label", &self.label)
            .field("width", &self.width)
            .field("display", &self.display.is_some())
            .finish()
    }
}

/// Structural notification for a grid view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableMessage {
    RowsDeleted { pos: usize, count: usize },
    RowsAppended { count: usize },
    ColsDeleted { pos: usize, count: usize },
    ColsAppended { count: usize },
    /// Re-read every displayed value.
    RequestValues,
}

/// Cell-level access to a row source through a column mapping.
pub struct GridTable<S: RowSource + ?Sized> {
    source: Rc<S>,
    columns: Vec<ColumnSpec>,
}

impl<S: RowSource + ?Sized> GridTable<S> {
    pub fn new(source: Rc<S>, columns: Vec<ColumnSpec>) -> Self {
        Self { source, columns }
    }

    #[inline]
    pub fn source(&self) -> &Rc<S> {
        &self.source
    }

    #[inline]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.source.row_count()
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn col_label(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(|c| c.label.as_str())
    }

    fn column(&self, col: usize) -> Result<&ColumnSpec> {
        self.columns
            .get(col)
            .ok_or_else(|| Error::out_of_range(col, self.columns.len()))
    }

    pub fn row(&self, row: usize) -> Result<Proxy> {
        self.source.get_row(row)
    }

    /// The value shown at (`row`, `col`), staged edits included.
    pub fn value(&self, row: usize, col: usize) -> Result<Value> {
        let column = self.column(col)?;
        self.source.get_row(row)?.value(&column.attribute)
    }

    /// Display text for a cell: the column's formatter if it has one,
    /// otherwise the value's text with Null shown as an empty string.
    pub fn text(&self, row: usize, col: usize) -> Result<String> {
        let column = self.column(col)?;
        let proxy = self.source.get_row(row)?;
        match &column.display {
            Some(display) => display(&proxy),
            None => Ok(proxy.value(&column.attribute)?.display_text()),
        }
    }

    /// Stages an edit of one cell on its row proxy.
    pub fn set_value(&self, row: usize, col: usize, value: impl Into<Field>) -> Result<()> {
        let column = self.column(col)?;
        let proxy = self.source.get_row(row)?;
        tracing::trace!(row, attribute = column.attribute.as_str(), "cell edited");
        proxy.write(&column.attribute, value)
    }

    /// Messages that bring a view showing `shown_rows` x `shown_cols` to the
    /// current shape, ending with a request to re-read all values.
    pub fn reset_view(&self, shown_rows: usize, shown_cols: usize) -> Vec<TableMessage> {
        let mut messages = Vec::new();
        let rows = self.row_count();
        if rows < shown_rows {
            messages.push(TableMessage::RowsDeleted {
                pos: rows,
                count: shown_rows - rows,
            });
        } else if rows > shown_rows {
            messages.push(TableMessage::RowsAppended {
                count: rows - shown_rows,
            });
        }

        let cols = self.col_count();
        if cols < shown_cols {
            messages.push(TableMessage::ColsDeleted {
                pos: cols,
                count: shown_cols - cols,
            });
        } else if cols > shown_cols {
            messages.push(TableMessage::ColsAppended {
                count: cols - shown_cols,
            });
        }

        messages.push(TableMessage::RequestValues);
        messages
    }
}

impl<S: RowSource + ?Sized> core::fmt::Debug for GridTable<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridTable")
            .field("rows", &self.row_count())
            .field("columns", &self.columns)
            .finish()
    }
}
