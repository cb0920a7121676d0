//! Document collections.
//!
//! A `Collection` is a cheaply cloneable handle over shared state. Every
//! mutation emits a chain packet from the collection's node after the
//! state borrow is released, so handlers are free to re-enter the
//! collection. Reads always return decoupled documents.

use crate::database::DatabaseState;
use crate::events::{EventEmitter, ListenerId};
use crate::options::{Cursor, QueryOptions};
use crate::transform::TransformSettings;
use crate::view::ViewState;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use tarn_core::matching::matches;
use tarn_core::update::apply_update;
use tarn_core::{Document, IndexSpec, Value};
use tarn_index::MultiLevelTree;
use tarn_reactor::{ChainNode, ChainPacket};

/// The inserts, updates and removes required to make a collection equal a
/// target set under the shared primary key.
#[derive(Clone, Debug, Default)]
pub struct CollectionDiff {
    /// Documents present in the target but not here
    pub insert: Vec<Document>,
    /// Documents present in both but different in content
    pub update: Vec<Document>,
    /// Documents present here but not in the target
    pub remove: Vec<Document>,
}

impl CollectionDiff {
    /// Returns true if the diff changes nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Returns the total number of operations.
    #[inline]
    pub fn len(&self) -> usize {
        self.insert.len() + self.update.len() + self.remove.len()
    }
}

struct StoredIndex {
    spec: IndexSpec,
    tree: MultiLevelTree,
    dirty: bool,
}

pub(crate) struct CollectionState {
    name: String,
    primary_key: String,
    data: Vec<Document>,
    node: ChainNode,
    events: EventEmitter,
    dropped: bool,
    next_auto_id: u64,
    last_cursor: Cursor,
    transform: TransformSettings,
    indexes: Vec<StoredIndex>,
    views: Vec<Weak<RefCell<ViewState>>>,
    db: Option<Weak<RefCell<DatabaseState>>>,
}

/// A container of documents that emits chain packets on mutation.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<RefCell<CollectionState>>,
}

impl Collection {
    /// Creates a new empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let node = ChainNode::new(name.clone());
        Self {
            inner: Rc::new(RefCell::new(CollectionState {
                name,
                primary_key: String::from("_id"),
                data: Vec::new(),
                node,
                events: EventEmitter::new(),
                dropped: false,
                next_auto_id: 1,
                last_cursor: Cursor::default(),
                transform: TransformSettings::default(),
                indexes: Vec::new(),
                views: Vec::new(),
                db: None,
            })),
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Returns the primary key field name.
    pub fn primary_key(&self) -> String {
        self.inner.borrow().primary_key.clone()
    }

    /// Sets the primary key field and announces it on the chain.
    pub fn set_primary_key(&self, field: impl Into<String>) {
        let field = field.into();
        let node = {
            let mut state = self.inner.borrow_mut();
            if state.dropped || state.primary_key == field {
                return;
            }
            state.primary_key = field.clone();
            state.node.clone()
        };
        node.chain_send(&ChainPacket::primary_key(field));
    }

    /// Returns true once the collection has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.inner.borrow().dropped
    }

    /// Returns the collection's chain node.
    pub fn node(&self) -> ChainNode {
        self.inner.borrow().node.clone()
    }

    /// Returns true if both handles refer to the same collection.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers an event listener.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn() + 'static,
    {
        self.inner.borrow_mut().events.on(event, callback)
    }

    /// Unregisters an event listener.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.inner.borrow_mut().events.off(event, id)
    }

    fn emit(&self, event: &str) {
        let callbacks = self.inner.borrow().events.snapshot(event);
        for cb in callbacks {
            cb();
        }
    }

    pub(crate) fn emit_event(&self, event: &str) {
        self.emit(event);
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Inserts a single document. Returns the stored copy, or None if
    /// the collection is dropped.
    pub fn insert(&self, doc: Document) -> Option<Document> {
        self.insert_many(Vec::from([doc])).into_iter().next()
    }

    /// Inserts a batch of documents. Documents are decoupled on the way
    /// in; a missing primary key is assigned from the auto counter.
    pub fn insert_many(&self, docs: Vec<Document>) -> Vec<Document> {
        let (stored, node) = {
            let mut state = self.inner.borrow_mut();
            if state.dropped {
                return Vec::new();
            }
            let mut stored = Vec::with_capacity(docs.len());
            for doc in docs {
                let prepared = state.prepare(doc);
                state.data.push(prepared.decouple());
                stored.push(prepared);
            }
            state.mark_indexes_dirty();
            (stored, state.node.clone())
        };
        if stored.is_empty() {
            return stored;
        }
        node.chain_send(&ChainPacket::insert(stored.clone()));
        self.emit("change");
        stored
    }

    /// Replaces the entire data set and announces it as one packet.
    pub fn set_data(&self, docs: Vec<Document>) -> Vec<Document> {
        let (stored, node) = {
            let mut state = self.inner.borrow_mut();
            if state.dropped {
                return Vec::new();
            }
            let mut stored = Vec::with_capacity(docs.len());
            for doc in docs {
                let prepared = state.prepare(doc);
                stored.push(prepared);
            }
            state.data = stored.iter().map(Document::decouple).collect();
            state.mark_indexes_dirty();
            (stored, state.node.clone())
        };
        node.chain_send(&ChainPacket::set_data(stored.clone()));
        self.emit("change");
        stored
    }

    /// Applies an update to every document matching the query.
    ///
    /// Returns decoupled copies of the changed documents. The original
    /// query and update ride the emitted packet so downstream views diff
    /// against the post-update truth.
    pub fn update(&self, query: &Document, update: &Document) -> Vec<Document> {
        let (changed, node) = {
            let mut state = self.inner.borrow_mut();
            if state.dropped {
                return Vec::new();
            }
            let mut changed = Vec::new();
            for doc in state.data.iter_mut() {
                if matches(doc, query) && apply_update(doc, update) {
                    changed.push(doc.decouple());
                }
            }
            if !changed.is_empty() {
                state.mark_indexes_dirty();
            }
            (changed, state.node.clone())
        };
        if changed.is_empty() {
            return changed;
        }
        node.chain_send(&ChainPacket::update(query.decouple(), update.decouple()));
        self.emit("change");
        changed
    }

    /// Applies an update to the document with the given primary key.
    pub fn update_by_id(&self, id: &Value, update: &Document) -> bool {
        let pk = self.primary_key();
        let query = Document::new().with(pk, id.clone());
        !self.update(&query, update).is_empty()
    }

    /// Removes every document matching the query. An empty query removes
    /// everything. Returns the removed documents.
    pub fn remove(&self, query: &Document) -> Vec<Document> {
        let (removed, node) = {
            let mut state = self.inner.borrow_mut();
            if state.dropped {
                return Vec::new();
            }
            let mut removed = Vec::new();
            state.data.retain(|doc| {
                if matches(doc, query) {
                    removed.push(doc.decouple());
                    false
                } else {
                    true
                }
            });
            if !removed.is_empty() {
                state.mark_indexes_dirty();
            }
            (removed, state.node.clone())
        };
        if removed.is_empty() {
            return removed;
        }
        node.chain_send(&ChainPacket::remove(query.decouple()));
        self.emit("change");
        removed
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Finds documents matching the query, ordered and paginated per the
    /// options. Records the pagination cursor. Results are decoupled.
    pub fn find(&self, query: &Document, options: &QueryOptions) -> Vec<Document> {
        if let Some(spec) = &options.order_by {
            self.refresh_index(spec);
        }
        let (mut results, transform) = {
            let state = self.inner.borrow();
            if state.dropped {
                return Vec::new();
            }
            let results = match &options.order_by {
                Some(spec) => match state.index_for(spec) {
                    // A maintained index hands the data over pre-sorted
                    Some(index) => index
                        .tree
                        .in_order()
                        .into_iter()
                        .filter(|doc| matches(doc, query))
                        .collect(),
                    None => {
                        let mut hits: Vec<Document> = state
                            .data
                            .iter()
                            .filter(|doc| matches(doc, query))
                            .map(Document::decouple)
                            .collect();
                        hits.sort_by(|a, b| spec.compare(a, b));
                        hits
                    }
                },
                None => state
                    .data
                    .iter()
                    .filter(|doc| matches(doc, query))
                    .map(Document::decouple)
                    .collect(),
            };
            (results, state.transform.clone())
        };

        let records = results.len();
        let (pages, page) = match options.limit {
            Some(limit) if limit > 0 => {
                let pages = records.div_ceil(limit).max(1);
                let page = options.page.unwrap_or(0).min(pages - 1);
                let start = page * limit;
                let end = (start + limit).min(records);
                results = results[start..end].to_vec();
                (pages, page)
            }
            _ => (1, 0),
        };
        self.inner.borrow_mut().last_cursor = Cursor {
            pages,
            page,
            records,
        };

        if transform.enabled && transform.data_out.is_some() {
            results.iter().map(|doc| transform.apply_out(doc)).collect()
        } else {
            results
        }
    }

    /// Finds the first document matching the query.
    pub fn find_one(&self, query: &Document, options: &QueryOptions) -> Option<Document> {
        self.find(query, options).into_iter().next()
    }

    /// Finds the document with the given primary key.
    pub fn find_by_id(&self, id: &Value) -> Option<Document> {
        let pk = self.primary_key();
        let query = Document::new().with(pk, id.clone());
        self.find_one(&query, &QueryOptions::default())
    }

    /// Finds sub-documents: elements of the array at `path`, filtered by
    /// the query, gathered across every document.
    pub fn find_sub(&self, path: &str, query: &Document) -> Vec<Document> {
        let state = self.inner.borrow();
        let mut out = Vec::new();
        for doc in &state.data {
            let Some(Value::Array(items)) = doc.get_path(path) else {
                continue;
            };
            for item in items {
                if let Some(sub) = item.as_object() {
                    if matches(sub, query) {
                        out.push(sub.decouple());
                    }
                }
            }
        }
        out
    }

    /// Finds the first matching sub-document.
    pub fn find_sub_one(&self, path: &str, query: &Document) -> Option<Document> {
        self.find_sub(path, query).into_iter().next()
    }

    /// Returns the distinct values at a path, in first-seen order.
    pub fn distinct(&self, path: &str) -> Vec<Value> {
        let state = self.inner.borrow();
        let mut out: Vec<Value> = Vec::new();
        for doc in &state.data {
            if let Some(value) = doc.get_path(path) {
                if !out.contains(value) {
                    out.push(value.clone());
                }
            }
        }
        out
    }

    /// Returns decoupled copies of the documents a predicate accepts.
    pub fn filter<F>(&self, pred: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        self.inner
            .borrow()
            .data
            .iter()
            .filter(|doc| pred(doc))
            .map(Document::decouple)
            .collect()
    }

    /// Returns the number of documents.
    pub fn count(&self) -> usize {
        self.inner.borrow().data.len()
    }

    /// Returns the matching documents without pagination, cursor update
    /// or egress transform. This is the read the diffing path uses.
    pub fn subset(&self, query: &Document, options: &QueryOptions) -> Vec<Document> {
        let state = self.inner.borrow();
        if state.dropped {
            return Vec::new();
        }
        let mut hits: Vec<Document> = state
            .data
            .iter()
            .filter(|doc| matches(doc, query))
            .map(Document::decouple)
            .collect();
        if let Some(spec) = &options.order_by {
            hits.sort_by(|a, b| spec.compare(a, b));
        }
        hits
    }

    /// Returns every document, decoupled, in storage order.
    pub fn contents(&self) -> Vec<Document> {
        self.inner
            .borrow()
            .data
            .iter()
            .map(Document::decouple)
            .collect()
    }

    /// Returns the cursor recorded by the most recent `find`.
    pub fn cursor(&self) -> Cursor {
        self.inner.borrow().last_cursor
    }

    /// Computes what must be done to this collection for its contents to
    /// equal the target set under the shared primary key.
    pub fn diff(&self, target: &[Document]) -> CollectionDiff {
        let state = self.inner.borrow();
        let pk = state.primary_key.as_str();
        let mut diff = CollectionDiff::default();

        for wanted in target {
            let Some(id) = wanted.get(pk) else {
                continue;
            };
            match state.data.iter().find(|mine| mine.get(pk) == Some(id)) {
                Some(mine) if mine == wanted => {}
                Some(_) => diff.update.push(wanted.decouple()),
                None => diff.insert.push(wanted.decouple()),
            }
        }
        for mine in &state.data {
            let Some(id) = mine.get(pk) else {
                continue;
            };
            if !target.iter().any(|wanted| wanted.get(pk) == Some(id)) {
                diff.remove.push(mine.decouple());
            }
        }
        diff
    }

    // ---------------------------------------------------------------
    // Indexes
    // ---------------------------------------------------------------

    /// Ensures a compound-key index exists for the spec.
    ///
    /// Returns true if a new index was created. Ordered finds whose
    /// `order_by` matches a stored index read from it instead of sorting.
    pub fn ensure_index(&self, spec: IndexSpec) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.dropped || state.index_for(&spec).is_some() {
            return false;
        }
        state.indexes.push(StoredIndex {
            tree: MultiLevelTree::new(spec.clone()),
            spec,
            dirty: true,
        });
        true
    }

    /// Returns the number of stored indexes.
    pub fn index_count(&self) -> usize {
        self.inner.borrow().indexes.len()
    }

    /// Rebuilds the index for a spec if mutations made it stale.
    fn refresh_index(&self, spec: &IndexSpec) {
        let mut state = self.inner.borrow_mut();
        let signature = spec.signature();
        let stale = state
            .indexes
            .iter()
            .position(|i| i.spec.signature() == signature && i.dirty);
        if let Some(pos) = stale {
            let data: Vec<Document> = state.data.iter().map(Document::decouple).collect();
            let index = &mut state.indexes[pos];
            index.tree.clear();
            index.tree.insert_many(&data);
            index.dirty = false;
        }
    }

    // ---------------------------------------------------------------
    // Ordered-insert hooks used by views
    // ---------------------------------------------------------------

    /// Splices a document in at the given index and announces it. The
    /// index is clamped to the current length.
    pub fn insert_at(&self, index: usize, doc: Document) -> Option<Document> {
        let (stored, node) = {
            let mut state = self.inner.borrow_mut();
            if state.dropped {
                return None;
            }
            let prepared = state.prepare(doc);
            let index = index.min(state.data.len());
            state.data.insert(index, prepared.decouple());
            state.mark_indexes_dirty();
            (prepared, state.node.clone())
        };
        node.chain_send(&ChainPacket::insert_one(stored.clone()));
        self.emit("change");
        Some(stored)
    }

    /// Returns the storage position of the document with the given
    /// primary key value.
    pub fn position_of(&self, id: &Value) -> Option<usize> {
        let state = self.inner.borrow();
        let pk = state.primary_key.as_str();
        state.data.iter().position(|doc| doc.get(pk) == Some(id))
    }

    /// Moves a document between storage positions. Out-of-range moves
    /// are tolerated as no-ops.
    pub fn relocate(&self, from: usize, to: usize) {
        let mut state = self.inner.borrow_mut();
        if from == to || from >= state.data.len() {
            return;
        }
        let doc = state.data.remove(from);
        let to = to.min(state.data.len());
        state.data.insert(to, doc);
    }

    // ---------------------------------------------------------------
    // Transform pipeline
    // ---------------------------------------------------------------

    /// Installs transform settings. Ingress writes run `data_in`; reads
    /// run `data_out`.
    pub fn set_transform(&self, settings: TransformSettings) {
        self.inner.borrow_mut().transform = settings;
    }

    /// Returns true if a transform pipeline is active.
    pub fn is_transform_enabled(&self) -> bool {
        self.inner.borrow().transform.enabled
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Drops the collection: clears data, notifies listeners, removes it
    /// from the owning database. Idempotent; returns false on repeat.
    pub fn drop_collection(&self) -> bool {
        let db = {
            let mut state = self.inner.borrow_mut();
            if state.dropped {
                return false;
            }
            state.dropped = true;
            state.data.clear();
            state.indexes.clear();
            state.views.clear();
            state.db.take()
        };
        if let Some(db) = db.and_then(|w| w.upgrade()) {
            let name = self.name();
            db.borrow_mut().forget_collection(&name);
        }
        self.emit("drop");
        self.inner.borrow_mut().events.clear();
        true
    }

    // ---------------------------------------------------------------
    // Wiring used by views and the database
    // ---------------------------------------------------------------

    pub(crate) fn attach_db(&self, db: &Weak<RefCell<DatabaseState>>) {
        self.inner.borrow_mut().db = Some(db.clone());
    }

    pub(crate) fn db_handle(&self) -> Option<Rc<RefCell<DatabaseState>>> {
        self.inner.borrow().db.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn register_view(&self, view: Weak<RefCell<ViewState>>) {
        let mut state = self.inner.borrow_mut();
        state.views.retain(|w| w.strong_count() > 0);
        state.views.push(view);
    }

    pub(crate) fn unregister_view(&self, view: &Weak<RefCell<ViewState>>) {
        self.inner
            .borrow_mut()
            .views
            .retain(|w| w.strong_count() > 0 && !w.ptr_eq(view));
    }

    /// Returns the number of views currently attached to this source.
    pub fn attached_view_count(&self) -> usize {
        self.inner
            .borrow()
            .views
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl CollectionState {
    /// Runs the ingress transform (or decouples), then assigns a primary
    /// key when the field is missing.
    fn prepare(&mut self, doc: Document) -> Document {
        let mut doc = self.transform.apply_in(&doc);
        if !doc.contains_key(&self.primary_key) {
            let id = self.next_auto_id;
            self.next_auto_id += 1;
            doc.insert(self.primary_key.clone(), Value::from(id as i64));
        }
        doc
    }

    fn mark_indexes_dirty(&mut self) {
        for index in &mut self.indexes {
            index.dirty = true;
        }
    }

    fn index_for(&self, spec: &IndexSpec) -> Option<&StoredIndex> {
        let signature = spec.signature();
        self.indexes
            .iter()
            .find(|i| i.spec.signature() == signature)
    }
}

impl core::fmt::Debug for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Collection")
            .field("name", &state.name)
            .field("count", &state.data.len())
            .field("dropped", &state.dropped)
            .finish()
    }
}
