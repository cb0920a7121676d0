//! Order-maintenance bucket for sorted views.
//!
//! An `ActiveBucket` tracks the population of a sorted sequence and, for
//! each new or updated document, reports the index at which it must be
//! placed for the sequence to stay sorted under the bucket's index spec.
//! Ties place after existing equals, preserving insertion order.

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use tarn_core::{Document, IndexSpec, Value};

struct BucketEntry {
    key: Vec<Option<Value>>,
    pk: Option<Value>,
}

/// Reports sorted insertion positions for a continuously mutating sequence.
pub struct ActiveBucket {
    spec: IndexSpec,
    primary_key: String,
    entries: Vec<BucketEntry>,
}

impl ActiveBucket {
    /// Creates an empty bucket ordering by the given spec.
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            primary_key: String::from("_id"),
            entries: Vec::new(),
        }
    }

    /// Sets the identity field used to locate prior placements on remove.
    pub fn set_primary_key(&mut self, pk: impl Into<String>) {
        self.primary_key = pk.into();
    }

    /// Returns the identity field.
    #[inline]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Returns the ordering spec.
    #[inline]
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Returns the number of tracked documents.
    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no documents are tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records the document and returns the index at which it must be
    /// placed so the maintained sequence stays sorted.
    pub fn insert(&mut self, doc: &Document) -> usize {
        let key = self.spec.extract_key(doc);
        let pos = self
            .entries
            .partition_point(|e| self.spec.compare_keys(&e.key, &key) != Ordering::Greater);
        self.entries.insert(
            pos,
            BucketEntry {
                key,
                pk: doc.get(&self.primary_key).cloned(),
            },
        );
        pos
    }

    /// Removes the document, identified by primary key.
    ///
    /// Returns false if the document was not tracked.
    pub fn remove(&mut self, doc: &Document) -> bool {
        let Some(pk) = doc.get(&self.primary_key) else {
            return false;
        };
        match self
            .entries
            .iter()
            .position(|e| e.pk.as_ref() == Some(pk))
        {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Forgets all tracked documents.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rebuilds the bucket from a document sequence, in order.
    pub fn rebuild_from(&mut self, docs: &[Document]) {
        self.entries.clear();
        for doc in docs {
            self.insert(doc);
        }
    }
}

impl core::fmt::Debug for ActiveBucket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActiveBucket")
            .field("spec", &self.spec.signature())
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tarn_core::Order;

    fn make_doc(id: &str, n: i64) -> Document {
        Document::new()
            .with("_id", Value::from(id))
            .with("n", Value::from(n))
    }

    #[test]
    fn test_insert_positions_sorted() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        assert_eq!(bucket.insert(&make_doc("a", 3)), 0);
        assert_eq!(bucket.insert(&make_doc("b", 1)), 0);
        assert_eq!(bucket.insert(&make_doc("c", 2)), 1);
        assert_eq!(bucket.insert(&make_doc("d", 4)), 3);
        assert_eq!(bucket.count(), 4);
    }

    #[test]
    fn test_ties_place_after_equals() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        assert_eq!(bucket.insert(&make_doc("a", 1)), 0);
        assert_eq!(bucket.insert(&make_doc("b", 1)), 1);
        assert_eq!(bucket.insert(&make_doc("c", 1)), 2);
    }

    #[test]
    fn test_descending() {
        let mut bucket = ActiveBucket::new(IndexSpec::desc("n"));
        assert_eq!(bucket.insert(&make_doc("a", 1)), 0);
        assert_eq!(bucket.insert(&make_doc("b", 3)), 0);
        assert_eq!(bucket.insert(&make_doc("c", 2)), 1);
    }

    #[test]
    fn test_remove_by_primary_key() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        bucket.insert(&make_doc("a", 1));
        bucket.insert(&make_doc("b", 2));

        assert!(bucket.remove(&make_doc("a", 1)));
        assert_eq!(bucket.count(), 1);
        assert!(!bucket.remove(&make_doc("a", 1)));

        // Position reflects the remaining population
        assert_eq!(bucket.insert(&make_doc("c", 1)), 0);
    }

    #[test]
    fn test_remove_ignores_sort_field_change() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        bucket.insert(&make_doc("a", 1));
        // Removal is by identity, not by current sort key
        assert!(bucket.remove(&make_doc("a", 99)));
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_reposition_after_update() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        bucket.insert(&make_doc("a", 3));
        bucket.insert(&make_doc("b", 1));
        bucket.insert(&make_doc("c", 2));

        // Simulate updating a to n=0: remove then re-insert
        bucket.remove(&make_doc("a", 3));
        assert_eq!(bucket.insert(&make_doc("a", 0)), 0);
    }

    #[test]
    fn test_compound_spec() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n").with("m", Order::Desc));
        let doc = |id: &str, n: i64, m: i64| {
            Document::new()
                .with("_id", Value::from(id))
                .with("n", Value::from(n))
                .with("m", Value::from(m))
        };
        assert_eq!(bucket.insert(&doc("a", 1, 1)), 0);
        assert_eq!(bucket.insert(&doc("b", 1, 5)), 0);
        assert_eq!(bucket.insert(&doc("c", 2, 9)), 2);
    }

    #[test]
    fn test_rebuild_from() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        bucket.insert(&make_doc("a", 9));
        bucket.rebuild_from(&vec![make_doc("b", 1), make_doc("c", 2)]);
        assert_eq!(bucket.count(), 2);
        assert_eq!(bucket.insert(&make_doc("d", 0)), 0);
    }

    #[test]
    fn test_custom_primary_key() {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        bucket.set_primary_key("sku");
        let doc = Document::new()
            .with("sku", Value::from("x1"))
            .with("n", Value::from(1));
        bucket.insert(&doc);
        assert!(bucket.remove(&doc));
    }
}
