//! Stagehand Grid - windowed row caches and commit-on-navigate grid models.
//!
//! # Core Concepts
//!
//! - `WindowedCache`: lazily paged rows over a counted, sliceable query
//! - `GridModel`: rows, save/delete/create and search for one record type
//! - `GridTable`: cell access through a column mapping
//! - `CommitCoordinator`: commits the unit the cursor leaves, vetoing the
//!   move when the commit fails
//! - `DetailEditor`: one record edited through its own staged proxy
//! - `ChoiceProvider`: records matching partial text, for lookup editors
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use stagehand_core::schema::TableBuilder;
//! use stagehand_core::{DataType, UnitOfWork};
//! use stagehand_grid::{ColumnSpec, GridConfig, GridModel, LogReporter, ModelContext};
//! use stagehand_proxy::ProxyFactory;
//! use stagehand_storage::Session;
//!
//! let session = Session::new();
//! let schema = session
//!     .create_table(
//!         TableBuilder::new("skater")
//!             .unwrap()
//!             .add_column("name", DataType::String)
//!             .unwrap()
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//! for name in ["Bouke", "Arie"] {
//!     let record = session.create("skater").unwrap();
//!     record.set("name", name).unwrap();
//!     session.add(&record).unwrap();
//! }
//! session.commit().unwrap();
//!
//! let ctx = ModelContext::new(
//!     Rc::new(ProxyFactory::new(Rc::new(session.clone()))),
//!     Rc::new(session.clone()),
//!     Rc::new(LogReporter),
//! );
//! let model = GridModel::from_query(
//!     ctx,
//!     schema,
//!     Rc::new(session.query("skater").unwrap()),
//!     vec![ColumnSpec::new("name", "Name")],
//!     GridConfig::default(),
//! )
//! .unwrap();
//!
//! let table = model.table();
//! table.set_value(1, 0, "Arend").unwrap();
//! assert!(model.save(&table.row(1).unwrap()));
//! assert_eq!(table.text(1, 0).unwrap(), "Arend");
//! ```

#![no_std]

extern crate alloc;

pub mod commit;
pub mod config;
pub mod detail;
pub mod choice;
pub mod model;
pub mod report;
pub mod table;
pub mod window;

pub use choice::{ChoiceProvider, MIN_PARTIAL_LEN};
pub use commit::{
    CommitCoordinator, CommitState, CommitTarget, GridView, MoveOutcome, Position, SaveReport,
    Unit, UnitFlag,
};
pub use config::{Granularity, GridConfig};
pub use detail::DetailEditor;
pub use model::{GridModel, ModelContext, ModelEvent};
pub use report::{ErrorReporter, Failure, LogReporter, DATABASE_ERROR};
pub use table::{ColumnSpec, DisplayFn, GridTable, ListTable, RowSource, TableMessage};
pub use window::{ViewChange, WindowedCache};
