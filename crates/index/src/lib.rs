//! Tarn Index - Compound-key ordering indexes for the tarn database.
//!
//! This crate provides the two order structures the view layer builds on:
//!
//! - `MultiLevelTree`: a ternary indexed tree, one level per indexed field.
//!   Nodes with equal keys at a level share a middle subtree indexed on the
//!   next field, so in-order traversal yields the full compound-key order.
//! - `ActiveBucket`: an order-maintenance structure that reports the sorted
//!   insertion position for a document relative to the currently tracked
//!   population.
//!
//! # Example
//!
//! ```rust
//! use tarn_core::{Document, IndexSpec, Value};
//! use tarn_index::MultiLevelTree;
//!
//! let mut tree = MultiLevelTree::new(IndexSpec::asc("a").with("b", tarn_core::Order::Asc));
//! tree.insert(&Document::new().with("a", Value::from(1)).with("b", Value::from(2)));
//! tree.insert(&Document::new().with("a", Value::from(1)).with("b", Value::from(1)));
//!
//! let ordered = tree.in_order();
//! assert_eq!(ordered[0].get("b"), Some(&Value::from(1)));
//! ```

#![no_std]

extern crate alloc;

pub mod active_bucket;
pub mod multi_tree;

pub use active_bucket::ActiveBucket;
pub use multi_tree::{InsertResult, MultiLevelTree};
