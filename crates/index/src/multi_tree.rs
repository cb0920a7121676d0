//! Multi-level ternary indexed tree.
//!
//! One tree level indexes one field of the compound key. A node keeps the
//! documents equal to its representative on the current field in a `store`
//! bag; when deeper levels exist the same documents are also indexed into
//! the `middle` subtree on the next field. In-order traversal therefore
//! resolves ties through the middle chain and yields the full compound-key
//! order.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use tarn_core::order::compare_field;
use tarn_core::{Document, IndexSpec, Order, Value};

/// Result of a batch insertion.
#[derive(Clone, Debug, Default)]
pub struct InsertResult {
    /// Documents placed in the tree
    pub inserted: Vec<Document>,
    /// Documents rejected as malformed
    pub failed: Vec<Document>,
}

/// A compound-key index over a set of documents.
pub struct MultiLevelTree {
    spec: IndexSpec,
    root: TreeNode,
    len: usize,
}

struct TreeNode {
    /// Representative document establishing this node's key
    data: Option<Document>,
    /// Documents equal to `data` on this level's field, in insertion order
    store: Vec<Document>,
    left: Option<Box<TreeNode>>,
    middle: Option<Box<TreeNode>>,
    right: Option<Box<TreeNode>>,
}

impl TreeNode {
    fn new() -> Self {
        Self {
            data: None,
            store: Vec::new(),
            left: None,
            middle: None,
            right: None,
        }
    }

    /// `fields` is the remaining index spec for this level and deeper.
    fn insert(&mut self, doc: &Document, fields: &[(String, Order)]) {
        let Some(data) = &self.data else {
            self.data = Some(doc.decouple());
            self.insert_equal(doc, fields);
            return;
        };

        let (path, order) = &fields[0];
        match compare_field(doc.get_path(path), data.get_path(path), *order) {
            Ordering::Less => self
                .left
                .get_or_insert_with(|| Box::new(TreeNode::new()))
                .insert(doc, fields),
            Ordering::Greater => self
                .right
                .get_or_insert_with(|| Box::new(TreeNode::new()))
                .insert(doc, fields),
            Ordering::Equal => self.insert_equal(doc, fields),
        }
    }

    /// Places a document whose key equals this node's key on the current
    /// field: append to the bag and index deeper when levels remain.
    fn insert_equal(&mut self, doc: &Document, fields: &[(String, Order)]) {
        self.store.push(doc.decouple());
        if fields.len() > 1 {
            self.middle
                .get_or_insert_with(|| Box::new(TreeNode::new()))
                .insert(doc, &fields[1..]);
        }
    }

    fn in_order(&self, out: &mut Vec<Document>) {
        if self.data.is_none() {
            return;
        }
        if let Some(left) = &self.left {
            left.in_order(out);
        }
        match &self.middle {
            Some(middle) => middle.in_order(out),
            None => out.extend(self.store.iter().cloned()),
        }
        if let Some(right) = &self.right {
            right.in_order(out);
        }
    }

    fn lookup(&self, query: &Document, fields: &[(String, Order)], out: &mut Vec<Document>) {
        let Some(data) = &self.data else {
            return;
        };
        let (path, order) = &fields[0];

        let Some(constraint) = eq_constraint(query, path) else {
            // Unconstrained level: gather everything in order
            if let Some(left) = &self.left {
                left.lookup(query, fields, out);
            }
            match &self.middle {
                Some(middle) => middle.lookup(query, &fields[1..], out),
                None => out.extend(self.store.iter().cloned()),
            }
            if let Some(right) = &self.right {
                right.lookup(query, fields, out);
            }
            return;
        };

        match compare_field(Some(constraint), data.get_path(path), *order) {
            Ordering::Less => {
                if let Some(left) = &self.left {
                    left.lookup(query, fields, out);
                }
            }
            Ordering::Greater => {
                if let Some(right) = &self.right {
                    right.lookup(query, fields, out);
                }
            }
            Ordering::Equal => match &self.middle {
                Some(middle) => {
                    // Consumed this field; descend with a decoupled copy
                    let mut stripped = query.decouple();
                    stripped.remove(path);
                    middle.lookup(&stripped, &fields[1..], out);
                }
                None => out.extend(self.store.iter().cloned()),
            },
        }
    }
}

/// Returns the equality constraint a query places on a field, if any.
/// Queries carry dotted paths as flat keys, so this is a plain key
/// lookup. Operator objects do not constrain the tree; only values do.
fn eq_constraint<'a>(query: &'a Document, path: &str) -> Option<&'a Value> {
    let value = query.get(path)?;
    match value.as_object() {
        Some(obj) if obj.keys().any(|k| k.starts_with('$')) => None,
        _ => Some(value),
    }
}

impl MultiLevelTree {
    /// Creates an empty tree for the given index spec.
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            root: TreeNode::new(),
            len: 0,
        }
    }

    /// Returns the index spec this tree orders by.
    #[inline]
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Returns the number of documents placed in the tree.
    #[inline]
    pub fn count(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no documents.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a single document.
    pub fn insert(&mut self, doc: &Document) {
        if self.spec.is_empty() {
            // No indexed fields: everything is one equal-key bag
            self.root.data.get_or_insert_with(Document::new);
            self.root.store.push(doc.decouple());
            self.len += 1;
            return;
        }
        self.root.insert(doc, self.spec.fields());
        self.len += 1;
    }

    /// Inserts a batch, placing each document independently.
    pub fn insert_many(&mut self, docs: &[Document]) -> InsertResult {
        let mut result = InsertResult::default();
        for doc in docs {
            self.insert(doc);
            result.inserted.push(doc.decouple());
        }
        result
    }

    /// Yields all documents sorted under the full compound key. Equal-key
    /// documents appear in insertion order.
    pub fn in_order(&self) -> Vec<Document> {
        let mut out = Vec::with_capacity(self.len);
        self.root.in_order(&mut out);
        out
    }

    /// Finds documents whose indexed fields satisfy the query's equality
    /// constraints. Unconstrained levels are gathered whole; results keep
    /// compound-key order.
    pub fn lookup(&self, query: &Document) -> Vec<Document> {
        if self.spec.is_empty() {
            return self.root.store.iter().cloned().collect();
        }
        let mut out = Vec::new();
        self.root.lookup(query, self.spec.fields(), &mut out);
        out
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.root = TreeNode::new();
        self.len = 0;
    }
}
