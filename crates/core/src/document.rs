//! Document type for tarn.
//!
//! A `Document` is a JSON-style object with entries kept sorted by key so
//! field lookup is O(log n). Cloning a document is a structural deep copy;
//! the chain-reaction layer relies on this when it decouples payloads
//! before storage.

use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;

/// A document: an object with keys sorted for efficient lookup.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// Entries stored sorted by key for binary search
    entries: Vec<(String, Value)>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a document with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the document has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets a field value by key. O(log n)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Gets a mutable field value by key. O(log n)
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| &mut self.entries[idx].1)
    }

    /// Inserts a field, maintaining sorted order. Replaces any prior value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.binary_search_by(|(k, _)| k.as_str().cmp(&key)) {
            Ok(idx) => {
                self.entries[idx].1 = value;
            }
            Err(idx) => {
                self.entries.insert(idx, (key, value));
            }
        }
    }

    /// Removes a field and returns its value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.entries.remove(idx).1)
    }

    /// Returns true if the document contains the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .is_ok()
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Returns an iterator over key-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builder-style insert, for constructing documents inline.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Produces a decoupled copy: a structural deep copy sharing no data
    /// with the original. Mutating the copy never affects the source.
    #[inline]
    pub fn decouple(&self) -> Document {
        self.clone()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .zip(other.entries.iter())
            .all(|((k1, v1), (k2, v2))| k1 == k2 && v1 == v2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_insert_get() {
        let mut doc = Document::new();
        doc.insert("b", Value::from(2));
        doc.insert("a", Value::from(1));
        doc.insert("c", Value::from(3));

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get("a"), Some(&Value::from(1)));
        assert_eq!(doc.get("b"), Some(&Value::from(2)));
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn test_document_keys_sorted() {
        let doc = Document::new()
            .with("zeta", Value::from(1))
            .with("alpha", Value::from(2))
            .with("mid", Value::from(3));

        let keys: alloc::vec::Vec<&str> = doc.keys().collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_document_insert_replaces() {
        let mut doc = Document::new().with("a", Value::from(1));
        doc.insert("a", Value::from(9));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("a"), Some(&Value::from(9)));
    }

    #[test]
    fn test_document_remove() {
        let mut doc = Document::new()
            .with("a", Value::from(1))
            .with("b", Value::from(2));

        assert_eq!(doc.remove("a"), Some(Value::from(1)));
        assert_eq!(doc.remove("a"), None);
        assert!(!doc.contains_key("a"));
        assert!(doc.contains_key("b"));
    }

    #[test]
    fn test_document_eq() {
        let a = Document::new()
            .with("x", Value::from(1))
            .with("y", Value::from("s"));
        let b = Document::new()
            .with("y", Value::from("s"))
            .with("x", Value::from(1));
        assert_eq!(a, b);

        let c = b.clone().with("z", Value::Null);
        assert_ne!(a, c);
    }

    #[test]
    fn test_decouple_is_deep() {
        let inner = Document::new().with("n", Value::from(1));
        let doc = Document::new().with("inner", Value::Object(inner));

        let mut copy = doc.decouple();
        copy.get_mut("inner")
            .and_then(|v| v.as_object_mut())
            .map(|o| o.insert("n", Value::from(99)));

        // Original untouched
        let orig = doc.get("inner").and_then(|v| v.as_object()).unwrap();
        assert_eq!(orig.get("n"), Some(&Value::from(1)));
    }
}
