//! Stagehand Storage - in-memory reference persistence layer.
//!
//! This crate implements the persistence contracts of `stagehand-core`:
//!
//! - `RowStore`: row storage with primary key and unique indices
//! - `TableCache`: one store per record type
//! - `Journal` / `Transaction`: journaled writes with rollback
//! - `ConstraintChecker`: type and not-null validation
//! - `Session`: unit of work, identity map and flush event feed
//! - `Query`: filtered, ordered, sliceable result sets
//!
//! # Example
//!
//! ```rust
//! use stagehand_core::schema::TableBuilder;
//! use stagehand_core::{DataType, RecordQuery, UnitOfWork};
//! use stagehand_storage::Session;
//!
//! let session = Session::new();
//! session
//!     .create_table(
//!         TableBuilder::new("skater")
//!             .unwrap()
//!             .add_column("name", DataType::String)
//!             .unwrap()
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let record = session.create("skater").unwrap();
//! record.set("name", "Bouke").unwrap();
//! session.add(&record).unwrap();
//! session.commit().unwrap();
//!
//! assert_eq!(session.query("skater").unwrap().count().unwrap(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod constraint;
pub mod journal;
pub mod query;
pub mod row_store;
pub mod session;
pub mod transaction;

pub use cache::TableCache;
pub use constraint::ConstraintChecker;
pub use journal::{summarize, ChangeCounts, Journal, JournalEntry};
pub use query::{Order, Query};
pub use row_store::RowStore;
pub use session::Session;
pub use transaction::{Transaction, TransactionId, TransactionState};
