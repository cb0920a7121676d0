//! Query predicate evaluation.
//!
//! Provides a single, canonical implementation used by both the re-query
//! path (`Collection::find`) and the chain-gating path (the view's
//! interposed transform), ensuring identical semantics across both.
//!
//! A query is itself a `Document`:
//!
//! - `field: value` matches by deep equality at the (dotted) path; when the
//!   stored value is an array, equality with any element also matches
//! - `$eq` `$ne` `$gt` `$gte` `$lt` `$lte` compare ordered values
//! - `$in` / `$nin` test membership in a query array
//! - `$exists` tests field presence
//! - `$mod` takes `[divisor, remainder]` over integer values
//! - `$or` / `$and` combine arrays of sub-queries
//! - `$not` negates a field sub-query
//!
//! Unknown `$` operators match nothing.

use crate::document::Document;
use crate::value::Value;
use core::cmp::Ordering;

/// Evaluates a query against a document.
///
/// An empty query matches every document.
pub fn matches(doc: &Document, query: &Document) -> bool {
    for (key, constraint) in query.iter() {
        let ok = match key {
            "$or" => match constraint.as_array() {
                Some(subs) => subs.iter().any(|sub| match sub.as_object() {
                    Some(q) => matches(doc, q),
                    None => false,
                }),
                None => false,
            },
            "$and" => match constraint.as_array() {
                Some(subs) => subs.iter().all(|sub| match sub.as_object() {
                    Some(q) => matches(doc, q),
                    None => false,
                }),
                None => false,
            },
            _ if key.starts_with('$') => false,
            path => match_field(doc.get_path(path), constraint),
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Evaluates one field constraint against the resolved value.
fn match_field(actual: Option<&Value>, constraint: &Value) -> bool {
    if let Some(ops) = operator_object(constraint) {
        return ops.iter().all(|(op, operand)| match op {
            "$eq" => equals(actual, operand),
            "$ne" => !equals(actual, operand),
            "$gt" => ordered(actual, operand, |o| o == Ordering::Greater),
            "$gte" => ordered(actual, operand, |o| o != Ordering::Less),
            "$lt" => ordered(actual, operand, |o| o == Ordering::Less),
            "$lte" => ordered(actual, operand, |o| o != Ordering::Greater),
            "$in" => match operand.as_array() {
                Some(set) => set.iter().any(|v| equals(actual, v)),
                None => false,
            },
            "$nin" => match operand.as_array() {
                Some(set) => !set.iter().any(|v| equals(actual, v)),
                None => false,
            },
            "$exists" => match operand.as_bool() {
                Some(want) => actual.is_some() == want,
                None => false,
            },
            "$mod" => match (actual.and_then(Value::as_i64), operand.as_array()) {
                (Some(n), Some(pair)) if pair.len() == 2 => {
                    match (pair[0].as_i64(), pair[1].as_i64()) {
                        (Some(divisor), Some(remainder)) if divisor != 0 => {
                            n.rem_euclid(divisor) == remainder
                        }
                        _ => false,
                    }
                }
                _ => false,
            },
            "$not" => !match_field(actual, operand),
            _ => false,
        });
    }
    equals(actual, constraint)
}

/// Deep equality with the array-contains rule: a stored array matches a
/// non-array constraint when any element is equal.
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => false,
        Some(v) if v == expected => true,
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| item == expected)
        }
        Some(_) => false,
    }
}

/// Ordered comparison; only values of the same ordered type class compare.
fn ordered(actual: Option<&Value>, operand: &Value, pred: fn(Ordering) -> bool) -> bool {
    match actual {
        Some(v) if v.same_ordered_class(operand) => pred(v.total_cmp(operand)),
        _ => false,
    }
}

/// Returns the operator entries if the constraint is an object whose keys
/// are all `$` operators. A plain object constraint means deep equality.
fn operator_object(constraint: &Value) -> Option<&Document> {
    match constraint.as_object() {
        Some(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => Some(obj),
        _ => None,
    }
}
