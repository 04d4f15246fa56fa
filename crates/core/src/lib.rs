//! Stagehand Core - values, schemas, records and persistence contracts.
//!
//! This crate provides the foundational types shared by every Stagehand crate:
//!
//! - `DataType` / `Value`: attribute types and runtime values
//! - `schema`: record type definitions (`Table`, `Column`, `TableBuilder`)
//! - `Row`: the persisted form of a record
//! - `Record`: a shared source instance with change tracking and weak
//!   back-references to its wrappers
//! - `persist`: the traits a persistence layer implements
//! - `Error`: the error type used across the workspace
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use stagehand_core::{DataType, Record, Value};
//! use stagehand_core::schema::TableBuilder;
//!
//! let skater = Rc::new(
//!     TableBuilder::new("skater")
//!         .unwrap()
//!         .add_column("first_name", DataType::String)
//!         .unwrap()
//!         .build()
//!         .unwrap(),
//! );
//!
//! let record = Record::new(skater);
//! record.set("first_name", "Bouke").unwrap();
//!
//! assert_eq!(record.get("first_name").unwrap(), Value::from("Bouke"));
//! assert_eq!(record.changed_attributes(), vec!["first_name"]);
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod pattern_match;
pub mod persist;
mod record;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use persist::{
    ChangeFeed, FlushEvent, FlushListener, QueryHandle, RecordChanges, RecordQuery, UnitOfWork,
};
pub use record::{BackRefs, Record, RecordState};
pub use row::{next_row_id, set_next_row_id_if_greater, Row, RowId};
pub use types::DataType;
pub use value::Value;
