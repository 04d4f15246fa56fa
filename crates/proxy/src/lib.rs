//! Stagehand Proxy - change-tracking proxies over persisted records.
//!
//! A view model never edits a record directly. It asks a `ProxyFactory` for a
//! proxy in one of two modes:
//!
//! - `Mode::Transparent`: reads and writes go straight to the record
//! - `Mode::Staged`: writes are buffered until `flush`, so an edit can be
//!   abandoned without touching the record
//!
//! After every commit the persistence layer publishes a `FlushEvent`; the
//! factory's `ChangeBridge` pushes the persisted values into every live proxy
//! of each changed record, settling staged values that were confirmed.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use stagehand_core::schema::TableBuilder;
//! use stagehand_core::{DataType, UnitOfWork, Value};
//! use stagehand_proxy::{Mode, ProxyFactory};
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
//! let factory = ProxyFactory::new(Rc::new(session.clone()));
//!
//! let record = session.create("skater").unwrap();
//! let proxy = factory.wrap(Some(&record), Mode::Staged).unwrap();
//! proxy.write("name", "Bouke").unwrap();
//! assert_eq!(record.get("name").unwrap(), Value::Null);
//!
//! proxy.flush().unwrap();
//! session.add(&record).unwrap();
//! session.commit().unwrap();
//! assert!(!proxy.has_changes());
//! ```

#![no_std]

extern crate alloc;

pub mod bridge;
pub mod factory;
pub mod field;
pub mod kind;
pub mod proxy;
pub mod registry;

pub use bridge::{ChangeBridge, ReconcileStats};
pub use factory::ProxyFactory;
pub use field::{unwrap, Field};
pub use kind::{FieldDescriptor, Mode, ProxyType};
pub use proxy::{AttributeChange, Proxy, Reconciled};
pub use registry::ProxyRegistry;
