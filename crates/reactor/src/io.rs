//! Reactor IO: an interposer between a source and a sink.
//!
//! A `ReactorIO` owns a chain node wired downstream of a source and
//! upstream of a sink. Every packet arriving from the source is given to
//! the transformer first. The transformer may emit rewritten packets
//! through the IO node (they flow to the sink) and report the original as
//! consumed, or report `false` to let the original through unchanged.

use crate::node::{ChainNode, WeakChainNode};
use crate::packet::ChainPacket;
use core::cell::Cell;

/// An interposer node wrapping a transformer callback.
pub struct ReactorIO {
    node: ChainNode,
    source: WeakChainNode,
    dropped: Cell<bool>,
}

impl ReactorIO {
    /// Wires a new interposer between `source` and `sink`.
    ///
    /// The transformer receives the IO's own node so it can `chain_send`
    /// rewritten packets toward the sink. Returning `true` suppresses the
    /// incoming packet; `false` forwards it unchanged.
    pub fn new<F>(source: &ChainNode, sink: &ChainNode, transform: F) -> Self
    where
        F: Fn(&ChainNode, &ChainPacket) -> bool + 'static,
    {
        let node = ChainNode::new("io");
        source.add_downstream(&node);
        node.add_downstream(sink);

        // The handler must not hold a strong handle to its own node
        let weak = node.downgrade();
        node.set_handler(move |packet| match weak.upgrade() {
            Some(own) => transform(&own, packet),
            None => false,
        });

        Self {
            node,
            source: source.downgrade(),
            dropped: Cell::new(false),
        }
    }

    /// Returns the IO's own node.
    #[inline]
    pub fn node(&self) -> &ChainNode {
        &self.node
    }

    /// Returns true if the interposer has been detached.
    #[inline]
    pub fn is_dropped(&self) -> bool {
        self.dropped.get()
    }

    /// Detaches from the source and disconnects the sink. Idempotent.
    pub fn drop_io(&self) -> bool {
        if self.dropped.get() {
            return false;
        }
        self.dropped.set(true);
        if let Some(source) = self.source.upgrade() {
            source.remove_downstream(&self.node);
        }
        self.node.clear_downstream();
        self.node.clear_handler();
        true
    }
}

impl Drop for ReactorIO {
    fn drop(&mut self) {
        self.drop_io();
    }
}
