//! Query options and pagination cursor.
//!
//! The typed rendition of the recognised option keys: `$orderBy` becomes
//! `order_by`, `$page` / `$limit` drive pagination, and `$decouple`
//! records the caller's copy preference (reads always hand out decoupled
//! documents; the flag is carried for contract fidelity).

use tarn_core::IndexSpec;

/// Options applied by `find` and carried by views.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryOptions {
    /// Ordering spec; when set, results are sorted and the view keeps an
    /// active bucket
    pub order_by: Option<IndexSpec>,
    /// Zero-based page index, meaningful with `limit`
    pub page: Option<usize>,
    /// Page size
    pub limit: Option<usize>,
    /// Whether callers receive copies (always honoured)
    pub decouple: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            order_by: None,
            page: None,
            limit: None,
            decouple: true,
        }
    }
}

impl QueryOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ordering spec.
    pub fn order_by(mut self, spec: IndexSpec) -> Self {
        self.order_by = Some(spec);
        self
    }

    /// Sets the page index.
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Pagination cursor recorded by the most recent `find`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Total number of pages
    pub pages: usize,
    /// Page the result window covered
    pub page: usize,
    /// Total matching records before the window was applied
    pub records: usize,
}
