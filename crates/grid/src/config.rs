//! Grid configuration.

use alloc::format;
use core::fmt;
use core::str::FromStr;
use stagehand_core::Error;

/// The unit at which staged edits are committed while navigating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Granularity {
    /// Leaving a cell commits its row.
    Cell,
    /// Leaving a row commits it.
    #[default]
    Row,
    /// Leaving a column commits every row edited in it.
    Column,
    /// Never commits automatically; the host calls `commit_all`.
    #[cfg_attr(feature = "serde", serde(alias = "grid"))]
    Table,
}

impl Granularity {
    /// Returns true if cursor moves may trigger commits.
    #[inline]
    pub fn is_automatic(self) -> bool {
        self != Granularity::Table
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Cell => "cell",
            Granularity::Row => "row",
            Granularity::Column => "column",
            Granularity::Table => "table",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cell" => Ok(Granularity::Cell),
            "row" => Ok(Granularity::Row),
            "column" => Ok(Granularity::Column),
            "table" | "grid" => Ok(Granularity::Table),
            other => Err(Error::invalid_operation(format!(
                "Unknown commit granularity: {}",
                other
            ))),
        }
    }
}

/// Settings shared by a grid model, its row cache and its commit coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GridConfig {
    /// Rows fetched on each side of a cache miss.
    pub page_size: usize,
    pub granularity: Granularity,
    /// Commit each saved row at once instead of queueing it.
    pub autocommit: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            granularity: Granularity::default(),
            autocommit: true,
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }
}
