//! Tarn Core - Core types for the tarn in-memory document database.
//!
//! This crate provides the foundational types shared by every tarn crate:
//!
//! - `Value`: Runtime values a document field can hold
//! - `Document`: A JSON-style object with sorted keys and O(log n) field access
//! - `path`: Dotted field-path resolution over nested documents
//! - `matching`: The canonical query predicate (`matches`)
//! - `update`: Update-operator application (`apply_update`)
//! - `Order` / `IndexSpec`: Compound sort-key specifications and comparison
//! - `Error`: Error types for database operations
//!
//! # Example
//!
//! ```rust
//! use tarn_core::{Document, Value, matching::matches};
//!
//! let doc = Document::new()
//!     .with("_id", Value::from(1))
//!     .with("age", Value::from(30));
//!
//! let query = Document::new().with(
//!     "age",
//!     Value::Object(Document::new().with("$gte", Value::from(25))),
//! );
//!
//! assert!(matches(&doc, &query));
//! ```

#![no_std]

extern crate alloc;

pub mod document;
pub mod error;
pub mod matching;
pub mod order;
pub mod path;
pub mod update;
pub mod value;

pub use document::Document;
pub use error::{Error, Result};
pub use order::{IndexSpec, Order};
pub use value::Value;
