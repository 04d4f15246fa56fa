//! End-to-end grid scenarios against the in-memory session.

use stagehand_core::schema::{Table, TableBuilder};
use stagehand_core::{DataType, QueryHandle, Record, RecordQuery, Result, UnitOfWork, Value};
use stagehand_grid::{
    ColumnSpec, CommitCoordinator, DetailEditor, ErrorReporter, Failure, Granularity, GridConfig,
    GridModel, GridView, ModelContext, MoveOutcome, Position, Unit, UnitFlag,
};
use stagehand_proxy::ProxyFactory;
use stagehand_reactive::CallQueue;
use stagehand_storage::{Query, Session};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Session query that records the slices it serves.
struct Recorded {
    inner: Query,
    slices: Rc<RefCell<Vec<(usize, usize)>>>,
}

impl RecordQuery for Recorded {
    fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    fn slice(&self, start: usize, stop: usize) -> Result<Vec<Record>> {
        self.slices.borrow_mut().push((start, stop));
        self.inner.slice(start, stop)
    }

    fn filter_like(&self, attribute: &str, pattern: &str) -> Result<QueryHandle> {
        Ok(Rc::new(Recorded {
            inner: self.inner.filter_like(attribute, pattern)?,
            slices: self.slices.clone(),
        }))
    }
}

#[derive(Default)]
struct Reports(RefCell<Vec<String>>);

impl ErrorReporter for Reports {
    fn report(&self, failure: Failure) {
        self.0.borrow_mut().push(failure.topic.to_string());
    }
}

#[derive(Default)]
struct View {
    editor_open: Cell<bool>,
    cursor: Cell<Option<Position>>,
    flags: RefCell<Vec<(Unit, UnitFlag)>>,
}

impl GridView for View {
    fn is_editor_open(&self) -> bool {
        self.editor_open.get()
    }

    fn close_editor(&self) {
        self.editor_open.set(false);
    }

    fn set_cursor(&self, pos: Position) {
        self.cursor.set(Some(pos));
    }

    fn set_flag(&self, unit: Unit, flag: UnitFlag) {
        self.flags.borrow_mut().push((unit, flag));
    }
}

struct Fixture {
    session: Session,
    schema: Rc<Table>,
    ctx: ModelContext,
    reports: Rc<Reports>,
    slices: Rc<RefCell<Vec<(usize, usize)>>>,
}

fn fixture(rows: usize) -> Fixture {
    let session = Session::new();
    let schema = session
        .create_table(
            TableBuilder::new("skater")
                .unwrap()
                .add_column("name", DataType::String)
                .unwrap()
                .add_column("age", DataType::Int32)
                .unwrap()
                .add_nullable(&["age"])
                .add_unique("name")
                .unwrap()
                .build()
                .unwrap(),
        )
        .unwrap();
    for i in 0..rows {
        let record = session.create("skater").unwrap();
        record.set("name", format!("skater {:03}", i)).unwrap();
        session.add(&record).unwrap();
    }
    session.commit().unwrap();

    let reports = Rc::new(Reports::default());
    let ctx = ModelContext::new(
        Rc::new(ProxyFactory::new(Rc::new(session.clone()))),
        Rc::new(session.clone()),
        reports.clone(),
    );
    Fixture {
        session,
        schema,
        ctx,
        reports,
        slices: Rc::new(RefCell::new(Vec::new())),
    }
}

fn model(f: &Fixture, config: GridConfig) -> GridModel {
    let query = Recorded {
        inner: f.session.query("skater").unwrap(),
        slices: f.slices.clone(),
    };
    GridModel::from_query(
        f.ctx.clone(),
        f.schema.clone(),
        Rc::new(query),
        vec![ColumnSpec::new("name", "Name"), ColumnSpec::new("age", "Age")],
        config,
    )
    .unwrap()
    .with_search("name")
}

#[test]
fn test_window_fetches_over_120_rows() {
    let f = fixture(120);
    let model = model(&f, GridConfig::default());
    let cache = model.cache().unwrap();
    assert_eq!(model.row_count(), 120);

    let row = cache.get_row(80).unwrap();
    assert_eq!(row.value("name").unwrap(), Value::from("skater 080"));
    assert_eq!(*f.slices.borrow(), vec![(30, 120)]);
    assert!(!cache.is_cached(29));

    cache.get_row(10).unwrap();
    assert_eq!(*f.slices.borrow(), vec![(30, 120), (0, 60)]);
    assert_eq!(cache.cached_len(), 120);
    assert!(cache.get_row(80).unwrap().ptr_eq(&row));

    for i in 0..120 {
        cache.get_row(i).unwrap();
    }
    assert_eq!(f.slices.borrow().len(), 2);
}

#[test]
fn test_failing_row_save_vetoes_move() {
    let f = fixture(10);
    let model = Rc::new(model(&f, GridConfig::new().granularity(Granularity::Row)));
    let view = Rc::new(View::default());
    let coordinator = CommitCoordinator::new(
        Granularity::Row,
        model.clone(),
        view.clone(),
        Rc::new(CallQueue::new()),
    );
    let table = model.table();

    assert_eq!(coordinator.request_move(Position::new(2, 0)), MoveOutcome::Allowed);
    coordinator.begin_edit();
    table.set_value(2, 0, "skater 007").unwrap();

    assert_eq!(coordinator.request_move(Position::new(5, 0)), MoveOutcome::Vetoed);
    assert_eq!(coordinator.cursor(), Position::new(2, 0));
    assert_eq!(
        view.flags.borrow().last(),
        Some(&(Unit::Row(2), UnitFlag::Error))
    );
    assert_eq!(*f.reports.0.borrow(), vec!["error.database".to_string()]);

    let row = table.row(2).unwrap();
    assert!(row.has_changes());
    assert_eq!(table.text(2, 0).unwrap(), "skater 007");
    assert_eq!(row.source().get("name").unwrap(), Value::from("skater 002"));

    table.set_value(2, 0, "skater 2b").unwrap();
    assert_eq!(coordinator.request_move(Position::new(5, 0)), MoveOutcome::Allowed);
    assert!(!row.has_changes());
    assert_eq!(row.source().get("name").unwrap(), Value::from("skater 2b"));
    assert_eq!(
        view.flags.borrow().last(),
        Some(&(Unit::Row(2), UnitFlag::Clean))
    );
}

#[test]
fn test_search_and_delete_refresh_the_window() {
    let f = fixture(30);
    let model = model(&f, GridConfig::default());
    let resets = Rc::new(Cell::new(0));
    let seen = resets.clone();
    model
        .cache()
        .unwrap()
        .subscribe(move |_| seen.set(seen.get() + 1));

    model.search("skater 01").unwrap();
    assert_eq!(model.row_count(), 10);
    assert_eq!(model.table().text(0, 0).unwrap(), "skater 010");

    let doomed = vec![model.row(0).unwrap(), model.row(1).unwrap()];
    assert!(model.delete_rows(&doomed));
    assert_eq!(model.row_count(), 8);
    assert_eq!(f.session.query("skater").unwrap().count().unwrap(), 28);

    model.search("").unwrap();
    assert_eq!(model.row_count(), 28);
    assert_eq!(resets.get(), 3);
}

#[test]
fn test_created_row_is_inserted_on_save() {
    let f = fixture(3);
    let model = model(&f, GridConfig::default());

    let row = model.create_row().unwrap();
    assert_eq!(model.row_count(), 4);
    assert!(model.row(3).unwrap().ptr_eq(&row));

    row.write("name", "Frida").unwrap();
    row.write("age", 12).unwrap();
    assert!(model.save(&row));
    assert!(!row.has_changes());
    assert_eq!(f.session.query("skater").unwrap().count().unwrap(), 4);
}

#[test]
fn test_deleting_a_created_row_keeps_the_others() {
    let f = fixture(3);
    let model = model(&f, GridConfig::default());

    let keep = model.create_row().unwrap();
    keep.write("name", "Frida").unwrap();
    let doomed = model.create_row().unwrap();

    assert!(model.delete_rows(&[doomed]));
    assert_eq!(model.row_count(), 4);
    assert!(model.row(3).unwrap().ptr_eq(&keep));
    assert_eq!(keep.value("name").unwrap(), Value::from("Frida"));
    assert!(f.reports.0.borrow().is_empty());

    assert!(model.save(&keep));
    assert_eq!(f.session.query("skater").unwrap().count().unwrap(), 4);
}

#[test]
fn test_table_granularity_saves_on_demand() {
    let f = fixture(5);
    let model = Rc::new(model(&f, GridConfig::new().granularity(Granularity::Table)));
    let view = Rc::new(View::default());
    let coordinator = CommitCoordinator::new(
        Granularity::Table,
        model.clone(),
        view.clone(),
        Rc::new(CallQueue::new()),
    );
    let table = model.table();

    table.set_value(0, 1, 30).unwrap();
    table.set_value(3, 0, "skater 001").unwrap();
    assert_eq!(coordinator.request_move(Position::new(4, 0)), MoveOutcome::Allowed);

    let report = coordinator.commit_all();
    assert_eq!(report.saved, 1);
    assert_eq!(report.failed_rows, vec![3]);
    assert_eq!(table.row(0).unwrap().source().get("age").unwrap(), Value::Int32(30));
    assert!(table.row(3).unwrap().has_changes());
}

#[test]
fn test_detail_commit_updates_grid_row() {
    let f = fixture(3);
    let model = model(&f, GridConfig::default());
    let row = model.row(1).unwrap();
    let notified = Rc::new(RefCell::new(Vec::new()));
    let sink = notified.clone();
    row.subscribe(move |change| sink.borrow_mut().push(change.new.clone()));

    let editor = DetailEditor::new(f.ctx.clone(), &row).unwrap();
    editor.object().write("age", 41).unwrap();
    assert_eq!(row.value("age").unwrap(), Value::Null);

    assert!(editor.commit());
    assert_eq!(*notified.borrow(), vec![Value::Int32(41)]);
    assert!(!row.has_changes());
}
