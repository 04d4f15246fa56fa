//! Detail editor: one record edited in isolation.
//!
//! The editor wraps the record behind whatever object it was handed in a
//! fresh staged proxy, so edits never leak into a grid row until they are
//! committed.

use crate::model::ModelContext;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use stagehand_core::{Error, Record, Result};
use stagehand_proxy::{Field, Mode, Proxy};

pub struct DetailEditor {
    ctx: ModelContext,
    original: Field,
    record: Record,
    proxy: Proxy,
    title: String,
}

impl DetailEditor {
    /// Opens an editor for the record held by `object` (a record or a proxy).
    pub fn new(ctx: ModelContext, object: impl Into<Field>) -> Result<Self> {
        let original = object.into();
        let record = original.as_record().ok_or_else(Error::null_source)?;
        let proxy = ctx.factory.wrap(Some(&record), Mode::Staged)?;
        let title = record.type_name().to_string();
        Ok(Self {
            ctx,
            original,
            record,
            proxy,
            title,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The staged proxy edits go through.
    #[inline]
    pub fn object(&self) -> &Proxy {
        &self.proxy
    }

    /// The object the editor was opened with.
    #[inline]
    pub fn original(&self) -> &Field {
        &self.original
    }

    /// The unwrapped record.
    #[inline]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Window title; the record type name unless set.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn has_changes(&self) -> bool {
        self.proxy.has_changes()
    }

    /// Persists the staged edits.
    ///
    /// On failure the unit of work is rolled back, the failure is reported
    /// and the edits stay staged. On success an original proxy that still
    /// shows other values is brought up to date.
    pub fn commit(&self) -> bool {
        let changes = self.proxy.changes();
        let committed = self
            .proxy
            .flush()
            .and_then(|()| self.ctx.unit.add(&self.record))
            .and_then(|()| self.ctx.unit.commit());
        if let Err(err) = committed {
            self.ctx.fail(err);
            return false;
        }

        if let Some(original) = self.original.as_proxy() {
            if !original.ptr_eq(&self.proxy) {
                self.write_back(original, changes);
            }
        }
        self.proxy.clear_changes();
        tracing::debug!(record = ?self.record, "detail committed");
        true
    }

    fn write_back(&self, original: &Proxy, changes: Vec<(String, Field)>) {
        for (attribute, value) in changes {
            let value = value.to_value();
            match original.value(&attribute) {
                Ok(shown) if shown == value => {}
                _ => {
                    if let Err(err) = original.write(&attribute, value) {
                        tracing::warn!(
                            error = %err,
                            attribute = attribute.as_str(),
                            "write back failed"
                        );
                    }
                }
            }
        }
    }

    /// Discards the staged edits.
    pub fn cancel(&self) {
        self.proxy.clear_changes();
    }
}

impl core::fmt::Debug for DetailEditor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DetailEditor")
            .field("title", &self.title)
            .field("object", &self.proxy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ErrorReporter, Failure};
    use alloc::rc::Rc;
    use core::cell::Cell;
    use stagehand_core::schema::TableBuilder;
    use stagehand_core::{DataType, UnitOfWork, Value};
    use stagehand_proxy::ProxyFactory;

    #[derive(Default)]
    struct FakeUnit {
        fail: Cell<bool>,
        rollbacks: Cell<usize>,
    }

    impl UnitOfWork for FakeUnit {
        fn add(&self, _record: &Record) -> Result<()> {
            Ok(())
        }

        fn delete(&self, _record: &Record) -> Result<()> {
            Ok(())
        }

        fn commit(&self) -> Result<()> {
            if self.fail.get() {
                Err(Error::invalid_operation("disk full"))
            } else {
                Ok(())
            }
        }

        fn rollback(&self) {
            self.rollbacks.set(self.rollbacks.get() + 1);
        }
    }

    #[derive(Default)]
    struct Count(Cell<usize>);

    impl ErrorReporter for Count {
        fn report(&self, _failure: Failure) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn record() -> Record {
        let record = Record::new(Rc::new(
            TableBuilder::new("skater")
                .unwrap()
                .add_column("name", DataType::String)
                .unwrap()
                .build()
                .unwrap(),
        ));
        record.set("name", "Bouke").unwrap();
        record.clear_changes();
        record
    }

    fn context(unit: Rc<FakeUnit>) -> (ModelContext, Rc<Count>) {
        let reporter = Rc::new(Count::default());
        let ctx = ModelContext::new(Rc::new(ProxyFactory::detached()), unit, reporter.clone());
        (ctx, reporter)
    }

    #[test]
    fn test_edits_are_isolated_until_commit() {
        let unit = Rc::new(FakeUnit::default());
        let (ctx, _) = context(unit);
        let record = record();
        let editor = DetailEditor::new(ctx, record.clone()).unwrap();

        assert_eq!(editor.title(), "skater");
        editor.object().write("name", "Arie").unwrap();
        assert_eq!(record.get("name").unwrap(), Value::from("Bouke"));

        assert!(editor.commit());
        assert!(!editor.has_changes());
        assert_eq!(record.get("name").unwrap(), Value::from("Arie"));
    }

    #[test]
    fn test_commit_writes_back_to_original_proxy() {
        let unit = Rc::new(FakeUnit::default());
        let (ctx, _) = context(unit);
        let record = record();
        let row = ctx.factory.wrap(Some(&record), Mode::Staged).unwrap();
        row.write("name", "Bo").unwrap();
        let editor = DetailEditor::new(ctx, &row).unwrap();

        assert_eq!(editor.object().value("name").unwrap(), Value::from("Bouke"));
        editor.object().write("name", "Arie").unwrap();
        assert!(editor.commit());
        assert_eq!(row.value("name").unwrap(), Value::from("Arie"));
        assert_eq!(record.get("name").unwrap(), Value::from("Arie"));
    }

    #[test]
    fn test_failed_commit_keeps_edits() {
        let unit = Rc::new(FakeUnit::default());
        unit.fail.set(true);
        let (ctx, reporter) = context(unit.clone());
        let editor = DetailEditor::new(ctx, record()).unwrap();

        editor.object().write("name", "Arie").unwrap();
        assert!(!editor.commit());
        assert!(editor.has_changes());
        assert_eq!(unit.rollbacks.get(), 1);
        assert_eq!(reporter.0.get(), 1);

        editor.cancel();
        assert!(!editor.has_changes());
    }

    #[test]
    fn test_needs_a_record() {
        let (ctx, _) = context(Rc::new(FakeUnit::default()));
        assert!(matches!(
            DetailEditor::new(ctx.clone(), Field::from("text")),
            Err(Error::NullSource)
        ));
    }
}
