//! Update-operator application.
//!
//! An update is a `Document`. `$`-prefixed keys are operators; bare keys
//! assign at the (dotted) path. Change detection is by value comparison so
//! no-op updates report unchanged.

use crate::document::Document;
use crate::value::Value;
use alloc::vec::Vec;

/// Applies an update document to a target document.
///
/// Returns true if the target changed.
pub fn apply_update(doc: &mut Document, update: &Document) -> bool {
    let mut changed = false;
    for (key, operand) in update.iter() {
        match key {
            "$set" => {
                if let Some(fields) = operand.as_object() {
                    for (path, value) in fields.iter() {
                        changed |= set_changed(doc, path, value);
                    }
                }
            }
            "$unset" => {
                if let Some(fields) = operand.as_object() {
                    for (path, _) in fields.iter() {
                        changed |= doc.remove_path(path).is_some();
                    }
                }
            }
            "$inc" => {
                if let Some(fields) = operand.as_object() {
                    for (path, delta) in fields.iter() {
                        changed |= increment(doc, path, delta);
                    }
                }
            }
            "$push" => {
                if let Some(fields) = operand.as_object() {
                    for (path, value) in fields.iter() {
                        push(doc, path, value.clone());
                        changed = true;
                    }
                }
            }
            "$pull" => {
                if let Some(fields) = operand.as_object() {
                    for (path, value) in fields.iter() {
                        changed |= pull(doc, path, value);
                    }
                }
            }
            _ if key.starts_with('$') => {}
            path => {
                changed |= set_changed(doc, path, operand);
            }
        }
    }
    changed
}

fn set_changed(doc: &mut Document, path: &str, value: &Value) -> bool {
    if doc.get_path(path) == Some(value) {
        return false;
    }
    doc.set_path(path, value.clone());
    true
}

fn increment(doc: &mut Document, path: &str, delta: &Value) -> bool {
    let (Some(d), Some(current)) = (delta.as_f64(), doc.get_path(path).and_then(Value::as_f64))
    else {
        return false;
    };
    if d == 0.0 {
        return false;
    }
    doc.set_path(path, Value::Number(current + d));
    true
}

fn push(doc: &mut Document, path: &str, value: Value) {
    match doc.get_path(path) {
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            items.push(value);
            doc.set_path(path, Value::Array(items));
        }
        _ => {
            doc.set_path(path, Value::Array(Vec::from([value])));
        }
    }
}

fn pull(doc: &mut Document, path: &str, value: &Value) -> bool {
    let Some(Value::Array(items)) = doc.get_path(path) else {
        return false;
    };
    let retained: Vec<Value> = items.iter().filter(|v| *v != value).cloned().collect();
    if retained.len() == items.len() {
        return false;
    }
    doc.set_path(path, Value::Array(retained));
    true
}
