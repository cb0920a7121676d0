//! Dotted field-path resolution over nested documents.
//!
//! Paths are dot-separated key sequences (`"address.city"`). Resolution
//! walks nested objects only; array elements are addressed by the matcher
//! and `find_sub`, not by paths.

use crate::document::Document;
use crate::value::Value;
use alloc::string::ToString;

impl Document {
    /// Resolves a dotted path to a value reference.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Sets a value at a dotted path, creating intermediate objects as
    /// needed. An intermediate non-object value is replaced by an object.
    pub fn set_path(&mut self, path: &str, value: Value) {
        match path.split_once('.') {
            None => self.insert(path, value),
            Some((head, rest)) => {
                if !matches!(self.get(head), Some(Value::Object(_))) {
                    self.insert(head.to_string(), Value::Object(Document::new()));
                }
                if let Some(Value::Object(obj)) = self.get_mut(head) {
                    obj.set_path(rest, value);
                }
            }
        }
    }

    /// Removes the value at a dotted path, returning it if present.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            None => self.remove(path),
            Some((head, rest)) => match self.get_mut(head) {
                Some(Value::Object(obj)) => obj.remove_path(rest),
                _ => None,
            },
        }
    }
}
