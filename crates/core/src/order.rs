//! Sort-order specifications and compound-key comparison.
//!
//! An `IndexSpec` names an ordered sequence of document fields, each with
//! its own direction. It induces the comparator used by the multi-level
//! tree, the active bucket, and `$orderBy` sorting: earlier fields order
//! first, equal prefixes fall to later fields, and an absent field sorts
//! before any present value.

use crate::document::Document;
use crate::value::Value;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;

/// Sort direction for one indexed field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

impl Order {
    /// Applies this direction to a comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

/// An ordered sequence of `(field path, direction)` pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexSpec {
    fields: Vec<(String, Order)>,
}

impl IndexSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates a single-field ascending spec.
    pub fn asc(path: impl Into<String>) -> Self {
        Self::new().with(path, Order::Asc)
    }

    /// Creates a single-field descending spec.
    pub fn desc(path: impl Into<String>) -> Self {
        Self::new().with(path, Order::Desc)
    }

    /// Appends a field to the spec.
    pub fn with(mut self, path: impl Into<String>, order: Order) -> Self {
        self.fields.push((path.into(), order));
        self
    }

    /// Builds a spec from the `{field: 1|-1}` option-document shape.
    /// Non-numeric entries are ignored; negative means descending.
    /// Document keys iterate in sorted order, so multi-field priority
    /// must use the `with` builder instead.
    pub fn from_order_doc(doc: &Document) -> Self {
        let mut spec = Self::new();
        for (key, value) in doc.iter() {
            if let Some(n) = value.as_f64() {
                let order = if n < 0.0 { Order::Desc } else { Order::Asc };
                spec.fields.push((key.to_string(), order));
            }
        }
        spec
    }

    /// Returns the field list.
    #[inline]
    pub fn fields(&self) -> &[(String, Order)] {
        &self.fields
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the spec names no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A stable textual signature, used to key stored indexes.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        for (i, (path, order)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(path);
            out.push(match order {
                Order::Asc => '+',
                Order::Desc => '-',
            });
        }
        out
    }

    /// Compares two documents under the full compound key.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (path, order) in &self.fields {
            let ord = compare_field(a.get_path(path), b.get_path(path), *order);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Extracts the sort key for a document: one optional value per field.
    pub fn extract_key(&self, doc: &Document) -> Vec<Option<Value>> {
        self.fields
            .iter()
            .map(|(path, _)| doc.get_path(path).cloned())
            .collect()
    }

    /// Compares two extracted sort keys.
    pub fn compare_keys(&self, a: &[Option<Value>], b: &[Option<Value>]) -> Ordering {
        for (i, (_, order)) in self.fields.iter().enumerate() {
            let av = a.get(i).and_then(|v| v.as_ref());
            let bv = b.get(i).and_then(|v| v.as_ref());
            let ord = compare_field(av, bv, *order);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Compares one field position. An absent value sorts before any present
/// value; values of different type classes compare equal at this level
/// (the query layer owns type coercion).
pub fn compare_field(a: Option<&Value>, b: Option<&Value>, order: Order) -> Ordering {
    let raw = match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(av), Some(bv)) => {
            if av.same_ordered_class(bv) || core::mem::discriminant(av) == core::mem::discriminant(bv)
            {
                av.total_cmp(bv)
            } else {
                Ordering::Equal
            }
        }
    };
    order.apply(raw)
}
