//! Chain node: a vertex in the propagation graph.
//!
//! A `ChainNode` is a cheaply cloneable handle. Downstream edges are weak
//! references, so the graph never keeps a dropped participant alive and a
//! node that disappears mid-dispatch is skipped. No `RefCell` borrow is
//! held while a handler runs, which makes reentrant sends from inside
//! handlers legal.

use crate::packet::ChainPacket;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

/// Handler invoked when a packet reaches a node. Returning `true` consumes
/// the packet: it does not continue past this node. Any other result
/// continues default propagation to the node's own downstream.
pub type PacketHandler = Rc<dyn Fn(&ChainPacket) -> bool>;

struct NodeInner {
    label: String,
    downstream: Vec<Weak<RefCell<NodeInner>>>,
    handler: Option<PacketHandler>,
}

/// A node in the chain-reaction graph.
#[derive(Clone)]
pub struct ChainNode {
    inner: Rc<RefCell<NodeInner>>,
}

/// A non-owning handle to a chain node.
#[derive(Clone)]
pub struct WeakChainNode {
    inner: Weak<RefCell<NodeInner>>,
}

impl ChainNode {
    /// Creates a new unconnected node.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeInner {
                label: label.into(),
                downstream: Vec::new(),
                handler: None,
            })),
        }
    }

    /// Returns the node's label.
    pub fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    /// Installs the intercepting handler, replacing any present.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&ChainPacket) -> bool + 'static,
    {
        self.inner.borrow_mut().handler = Some(Rc::new(handler));
    }

    /// Removes the handler; packets then flow through unexamined.
    pub fn clear_handler(&self) {
        self.inner.borrow_mut().handler = None;
    }

    /// Registers another node downstream of this one.
    pub fn add_downstream(&self, other: &ChainNode) {
        self.inner
            .borrow_mut()
            .downstream
            .push(Rc::downgrade(&other.inner));
    }

    /// Unregisters a downstream node. Returns true if an edge was removed.
    pub fn remove_downstream(&self, other: &ChainNode) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.downstream.len();
        inner
            .downstream
            .retain(|w| !w.ptr_eq(&Rc::downgrade(&other.inner)));
        inner.downstream.len() != before
    }

    /// Drops every downstream edge.
    pub fn clear_downstream(&self) {
        self.inner.borrow_mut().downstream.clear();
    }

    /// Returns the number of live downstream nodes.
    pub fn downstream_count(&self) -> usize {
        self.inner
            .borrow()
            .downstream
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Returns true if the given node is registered downstream.
    pub fn has_downstream(&self, other: &ChainNode) -> bool {
        let target = Rc::downgrade(&other.inner);
        self.inner
            .borrow()
            .downstream
            .iter()
            .any(|w| w.ptr_eq(&target))
    }

    /// Sends a packet to every downstream node.
    ///
    /// The downstream list is snapshotted before dispatch; handlers may
    /// mutate the graph and their edits apply to subsequent sends. At each
    /// receiving node the handler runs first; unless it consumes the
    /// packet, the node relays it onward through its own `chain_send`.
    pub fn chain_send(&self, packet: &ChainPacket) {
        let targets: Vec<Rc<RefCell<NodeInner>>> = self
            .inner
            .borrow()
            .downstream
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for target in targets {
            let node = ChainNode { inner: target };
            node.receive(packet);
        }
    }

    /// Delivers a packet to this node directly.
    pub fn receive(&self, packet: &ChainPacket) {
        let handler = self.inner.borrow().handler.clone();
        let consumed = match handler {
            Some(h) => h(packet),
            None => false,
        };
        if !consumed {
            self.chain_send(packet);
        }
    }

    /// Creates a non-owning handle to this node.
    pub fn downgrade(&self) -> WeakChainNode {
        WeakChainNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns true if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &ChainNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl WeakChainNode {
    /// Recovers a strong handle if the node is still alive.
    pub fn upgrade(&self) -> Option<ChainNode> {
        self.inner.upgrade().map(|inner| ChainNode { inner })
    }
}
