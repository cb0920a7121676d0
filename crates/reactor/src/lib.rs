//! Tarn Reactor - Chain-reaction change propagation for the tarn database.
//!
//! This crate implements the packet-routing graph that carries change
//! notifications between collections and views. When data mutates, the
//! owning node emits a typed chain packet which flows synchronously to
//! every downstream node; any node along the way may rewrite, suppress,
//! or pass a packet through.
//!
//! # Core Concepts
//!
//! - `ChainPacket`: A tagged change notification (setData, insert, update,
//!   remove, primaryKey)
//! - `ChainNode`: A node in the directed propagation graph with downstream
//!   listeners and an optional intercepting handler
//! - `ReactorIO`: An interposer wrapping a transformer between a specific
//!   upstream source and downstream sink
//!
//! # Dispatch model
//!
//! Delivery is single-threaded, synchronous, and depth-first: all
//! downstream handlers run to completion before `chain_send` returns.
//! Downstream lists are snapshotted at send time, so a handler may mutate
//! the graph; its edits take effect for subsequent sends. Downstream edges
//! are weak, so a node dropped mid-flight is skipped rather than revived.
//!
//! # Example
//!
//! ```rust
//! use tarn_reactor::{ChainNode, ChainPacket};
//! use tarn_core::{Document, Value};
//!
//! let source = ChainNode::new("source");
//! let sink = ChainNode::new("sink");
//! source.add_downstream(&sink);
//!
//! sink.set_handler(|packet| {
//!     // Returning true consumes the packet at this node
//!     matches!(packet, ChainPacket::Insert { .. })
//! });
//!
//! let doc = Document::new().with("_id", Value::from(1));
//! source.chain_send(&ChainPacket::insert(vec![doc]));
//! ```

#![no_std]

extern crate alloc;

pub mod io;
pub mod node;
pub mod packet;

pub use io::ReactorIO;
pub use node::{ChainNode, WeakChainNode};
pub use packet::ChainPacket;
