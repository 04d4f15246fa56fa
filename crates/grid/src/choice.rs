//! Choices for lookup editors.
//!
//! A `ChoiceProvider` answers "which records match what the user has typed
//! so far" for a combo or autocomplete cell bound to a reference attribute.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use stagehand_core::pattern_match::contains_pattern;
use stagehand_core::{QueryHandle, Record, Result, Value};

/// Partial text shorter than this yields no choices.
pub const MIN_PARTIAL_LEN: usize = 2;

/// Looks up records matching partial text.
#[derive(Clone)]
pub struct ChoiceProvider {
    query: QueryHandle,
    attribute: Option<String>,
    limit: Option<usize>,
    display: Option<Rc<dyn Fn(&Record) -> String>>,
}

impl ChoiceProvider {
    /// Offers every record of `query`.
    pub fn new(query: QueryHandle) -> Self {
        Self {
            query,
            attribute: None,
            limit: None,
            display: None,
        }
    }

    /// Matches partial text anywhere in `attribute`.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Returns at most `limit` choices.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_display<F>(mut self, display: F) -> Self
    where
        F: Fn(&Record) -> String + 'static,
    {
        self.display = Some(Rc::new(display));
        self
    }

    /// Records matching `partial` paired with their display text.
    ///
    /// `None` lists everything; text shorter than `MIN_PARTIAL_LEN`
    /// characters lists nothing.
    pub fn choices(&self, partial: Option<&str>) -> Result<Vec<(Record, String)>> {
        if let Some(text) = partial {
            if text.chars().count() < MIN_PARTIAL_LEN {
                return Ok(Vec::new());
            }
        }

        let query = match (&self.attribute, partial) {
            (Some(attribute), Some(text)) => {
                self.query.filter_like(attribute, &contains_pattern(text))?
            }
            _ => self.query.clone(),
        };
        let stop = match self.limit {
            Some(limit) => limit,
            None => query.count()?,
        };
        let records = query.slice(0, stop)?;
        tracing::trace!(?partial, found = records.len(), "choices");
        Ok(records
            .into_iter()
            .map(|record| {
                let text = self.display_text(Some(&record));
                (record, text)
            })
            .collect())
    }

    /// Text shown for a choice; empty for none.
    pub fn display_text(&self, record: Option<&Record>) -> String {
        match (record, &self.display) {
            (None, _) => String::new(),
            (Some(record), Some(display)) => display(record),
            (Some(record), None) => Value::from(record).display_text(),
        }
    }
}

impl core::fmt::Debug for ChoiceProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChoiceProvider")
            .field("attribute", &self.attribute)
            .field("limit", &self.limit)
            .finish()
    }
}
