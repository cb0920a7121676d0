//! Tarn Database - Collections, live views and the registry.
//!
//! This crate assembles the tarn engine: document `Collection`s feed
//! materialized `View`s through the chain-reaction graph, and a `Database`
//! holds the process-wide name registries.
//!
//! # Core Concepts
//!
//! - `Collection`: A document container. Every mutation emits a chain
//!   packet, so any number of views can stay live against it.
//! - `View`: A query-filtered, optionally transformed, optionally ordered
//!   projection of a source, kept incrementally consistent by intercepting
//!   the source's packets. Views can source other views.
//! - `TransformSettings`: An optional dataIn/dataOut pair producing a
//!   public projection of a view's private data.
//! - `Database`: The name registry. View names are unique per database and
//!   creating a duplicate fails loudly.
//!
//! # Example
//!
//! ```rust
//! use tarn_database::{Database, QueryOptions};
//! use tarn_core::{Document, Value};
//!
//! let db = Database::new("app");
//! let users = db.collection("users");
//! users.insert(Document::new().with("_id", Value::from(1)).with("age", Value::from(30)));
//!
//! let adults = users
//!     .view(
//!         "adults",
//!         Some(Document::new().with(
//!             "age",
//!             Value::Object(Document::new().with("$gte", Value::from(18))),
//!         )),
//!         QueryOptions::default(),
//!     )
//!     .unwrap();
//!
//! users.insert(Document::new().with("_id", Value::from(2)).with("age", Value::from(10)));
//! assert_eq!(adults.count(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod collection;
pub mod database;
pub mod events;
pub mod options;
pub mod transform;
pub mod view;

pub use collection::{Collection, CollectionDiff};
pub use database::{Database, ViewInfo};
pub use events::{EventEmitter, ListenerId};
pub use options::{Cursor, QueryOptions};
pub use transform::{TransformSettings, Transformer};
pub use view::{View, ViewPhase};
