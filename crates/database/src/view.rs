//! Live materialized views.
//!
//! A `View` is a query-filtered projection of a source collection (or of
//! another view, in which case it attaches upstream of that view's
//! transform layer). Binding interposes a `ReactorIO` whose transform
//! gates the source's packets: inserts are filtered against the view's
//! query, updates are re-expressed as the diff between the view's private
//! data and the matching subset of the source, and everything else flows
//! through. The surviving packets land in the view's handler node, which
//! is the only writer of the private collection.
//!
//! When ordering is set, an `ActiveBucket` tracks sorted positions so the
//! private data stays sorted without re-sorting on every change.

use crate::collection::Collection;
use crate::database::DatabaseState;
use crate::events::ListenerId;
use crate::options::{Cursor, QueryOptions};
use crate::transform::TransformSettings;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use tarn_core::matching::matches;
use tarn_core::{Document, Error, IndexSpec, Result, Value};
use tarn_index::ActiveBucket;
use tarn_reactor::{ChainNode, ChainPacket, ReactorIO};

/// Lifecycle phase of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewPhase {
    /// Created, not yet bound to a source
    Initialised,
    /// Bound to a source and receiving packets
    Bound,
    /// Dropped; operations are no-ops
    Dropped,
}

pub(crate) struct ViewState {
    name: String,
    query: Option<Document>,
    options: QueryOptions,
    phase: ViewPhase,
    private_data: Collection,
    source: Option<Collection>,
    source_drop_listener: Option<ListenerId>,
    io: Option<ReactorIO>,
    sink: ChainNode,
    bucket: Option<ActiveBucket>,
    transform: TransformSettings,
    public_data: Option<Collection>,
    mirror_io: Option<ReactorIO>,
    last_cursor: Cursor,
    db: Option<Weak<RefCell<DatabaseState>>>,
}

/// A materialized, query-filtered, optionally ordered projection of a
/// source, kept live through the chain-reaction graph.
#[derive(Clone)]
pub struct View {
    inner: Rc<RefCell<ViewState>>,
}

impl View {
    /// Creates an unbound view with no query.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_query(name, None, QueryOptions::default())
    }

    /// Creates an unbound view with query settings.
    pub fn with_query(
        name: impl Into<String>,
        query: Option<Document>,
        options: QueryOptions,
    ) -> Self {
        let name = name.into();
        let private_data = Collection::new(format!("{}_internalPrivate", name));
        let sink = ChainNode::new(format!("{}_handler", name));
        let bucket = options
            .order_by
            .as_ref()
            .map(|spec| ActiveBucket::new(spec.clone()));

        let view = View {
            inner: Rc::new(RefCell::new(ViewState {
                name,
                query,
                options,
                phase: ViewPhase::Initialised,
                private_data,
                source: None,
                source_drop_listener: None,
                io: None,
                sink: sink.clone(),
                bucket,
                transform: TransformSettings::default(),
                public_data: None,
                mirror_io: None,
                last_cursor: Cursor::default(),
                db: None,
            })),
        };

        let weak = Rc::downgrade(&view.inner);
        sink.set_handler(move |packet| {
            if let Some(state) = weak.upgrade() {
                View::handle_packet(&state, packet);
            }
            true
        });

        view
    }

    /// Returns the view name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Returns the lifecycle phase.
    pub fn phase(&self) -> ViewPhase {
        self.inner.borrow().phase
    }

    /// Returns true once the view has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.inner.borrow().phase == ViewPhase::Dropped
    }

    /// Returns the view's private collection. Mutated only by chain
    /// packets; exposed for sourcing other views and for inspection.
    pub fn private_data(&self) -> Collection {
        self.inner.borrow().private_data.clone()
    }

    /// Returns the collection reads go through: the public projection
    /// when transforms are enabled, else the private data.
    pub fn public_data(&self) -> Collection {
        let state = self.inner.borrow();
        match (&state.public_data, state.transform.enabled) {
            (Some(public), true) => public.clone(),
            _ => state.private_data.clone(),
        }
    }

    /// Returns the current query, if set.
    pub fn current_query(&self) -> Option<Document> {
        self.inner.borrow().query.clone()
    }

    /// Returns the current query options.
    pub fn current_options(&self) -> QueryOptions {
        self.inner.borrow().options.clone()
    }

    pub(crate) fn attach_db(&self, db: &Weak<RefCell<DatabaseState>>) {
        self.inner.borrow_mut().db = Some(db.clone());
    }

    // ---------------------------------------------------------------
    // Binding
    // ---------------------------------------------------------------

    /// Binds the view to a source collection.
    ///
    /// Any prior binding is torn down first. The view seeds its private
    /// data from `source.find(query, options)` and then stays live by
    /// intercepting the source's packets.
    pub fn from(&self, source: &Collection) {
        if self.is_dropped() {
            return;
        }
        self.unbind();

        // Observe upstream drop: detach, keeping last known data
        let weak = Rc::downgrade(&self.inner);
        let listener = source.on("drop", move || {
            if let Some(state) = weak.upgrade() {
                let (io, source) = {
                    let mut s = state.borrow_mut();
                    s.source_drop_listener = None;
                    (s.io.take(), s.source.take())
                };
                drop(io);
                drop(source);
            }
        });

        let io = {
            let state = self.inner.borrow();
            ReactorIO::new(
                &source.node(),
                &state.sink,
                Self::gate(Rc::downgrade(&self.inner)),
            )
        };

        {
            let mut state = self.inner.borrow_mut();
            state.source = Some(source.clone());
            state.source_drop_listener = Some(listener);
            state.io = Some(io);
            state.phase = ViewPhase::Bound;
        }
        source.register_view(Rc::downgrade(&self.inner));

        // Seed
        let (query, options, private) = {
            let state = self.inner.borrow();
            (
                state.query.clone().unwrap_or_default(),
                state.options.clone(),
                state.private_data.clone(),
            )
        };
        let docs = source.find(&query, &options);
        self.inner.borrow_mut().last_cursor = source.cursor();
        private.set_primary_key(source.primary_key());
        private.set_data(docs);
        self.rebuild_bucket();
    }

    /// Binds the view to another view, attaching upstream of that view's
    /// transform layer.
    pub fn from_view(&self, source: &View) {
        self.from(&source.private_data());
    }

    /// Binds the view to a collection resolved by name through the
    /// owning database.
    pub fn from_named(&self, name: &str) -> Result<()> {
        let db = self
            .inner
            .borrow()
            .db
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::no_database(name))?;
        let collection = {
            let state = db.borrow();
            state
                .collection_handle(name)
                .ok_or_else(|| Error::not_found(name))?
        };
        self.from(&collection);
        Ok(())
    }

    /// Tears down the current binding, if any.
    fn unbind(&self) {
        let (io, source, listener) = {
            let mut state = self.inner.borrow_mut();
            (
                state.io.take(),
                state.source.take(),
                state.source_drop_listener.take(),
            )
        };
        drop(io);
        if let Some(source) = source {
            if let Some(id) = listener {
                source.off("drop", id);
            }
            source.unregister_view(&Rc::downgrade(&self.inner));
        }
    }

    /// Builds the query-gated transform interposed between the source
    /// and the view's handler node.
    fn gate(
        weak: Weak<RefCell<ViewState>>,
    ) -> impl Fn(&ChainNode, &ChainPacket) -> bool + 'static {
        move |own, packet| {
            let Some(state) = weak.upgrade() else {
                return false;
            };
            let (dropped, query, options, private, source) = {
                let s = state.borrow();
                (
                    s.phase == ViewPhase::Dropped,
                    s.query.clone(),
                    s.options.clone(),
                    s.private_data.clone(),
                    s.source.clone(),
                )
            };
            if dropped {
                return false;
            }
            // No query: packets flow through verbatim
            let Some(query) = query else {
                return false;
            };

            match packet {
                ChainPacket::Insert { docs, .. } => {
                    let survivors: Vec<Document> = docs
                        .iter()
                        .filter(|doc| matches(doc, &query))
                        .map(Document::decouple)
                        .collect();
                    if !survivors.is_empty() {
                        own.chain_send(&ChainPacket::insert(survivors));
                    }
                    true
                }
                ChainPacket::Update { .. } => {
                    let Some(source) = source else {
                        return false;
                    };
                    let target = source.subset(&query, &options);
                    let diff = private.diff(&target);
                    if diff.is_empty() {
                        return false;
                    }
                    let pk = private.primary_key();
                    if !diff.insert.is_empty() {
                        own.chain_send(&ChainPacket::insert(diff.insert.clone()));
                    }
                    for doc in &diff.update {
                        if let Some(id) = doc.get(&pk) {
                            own.chain_send(&ChainPacket::update(
                                Document::new().with(pk.clone(), id.clone()),
                                doc.decouple(),
                            ));
                        }
                    }
                    if !diff.remove.is_empty() {
                        let branches: Vec<Value> = diff
                            .remove
                            .iter()
                            .filter_map(|doc| doc.get(&pk))
                            .map(|id| {
                                Value::Object(Document::new().with(pk.clone(), id.clone()))
                            })
                            .collect();
                        own.chain_send(&ChainPacket::remove(
                            Document::new().with("$or", Value::Array(branches)),
                        ));
                    }
                    true
                }
                // Everything else falls through; the handler or the diff
                // on a later update catches the net effect
                _ => false,
            }
        }
    }

    // ---------------------------------------------------------------
    // Packet handling (view as sink)
    // ---------------------------------------------------------------

    fn handle_packet(state: &Rc<RefCell<ViewState>>, packet: &ChainPacket) {
        match packet {
            ChainPacket::SetData { .. } => {
                let (source, query, options, private) = {
                    let s = state.borrow();
                    (
                        s.source.clone(),
                        s.query.clone().unwrap_or_default(),
                        s.options.clone(),
                        s.private_data.clone(),
                    )
                };
                let Some(source) = source else {
                    return;
                };
                let docs = source.find(&query, &options);
                state.borrow_mut().last_cursor = source.cursor();
                private.set_data(docs);
                Self::rebuild_bucket_in(state);
            }
            ChainPacket::Insert { docs, .. } => {
                let (private, ordered) = {
                    let s = state.borrow();
                    (s.private_data.clone(), s.bucket.is_some())
                };
                if ordered {
                    for doc in docs {
                        let doc = doc.decouple();
                        let index = {
                            let mut s = state.borrow_mut();
                            s.bucket.as_mut().map(|b| b.insert(&doc))
                        };
                        if let Some(index) = index {
                            private.insert_at(index, doc);
                        }
                    }
                } else {
                    private.insert_many(docs.iter().map(Document::decouple).collect());
                }
            }
            ChainPacket::Update { query, update, .. } => {
                let (private, ordered) = {
                    let s = state.borrow();
                    (s.private_data.clone(), s.bucket.is_some())
                };
                let changed = private.update(query, update);
                if !ordered {
                    return;
                }
                let pk = private.primary_key();
                for doc in &changed {
                    {
                        let mut s = state.borrow_mut();
                        if let Some(bucket) = s.bucket.as_mut() {
                            bucket.remove(doc);
                        }
                    }
                    let current = doc.get(&pk).and_then(|id| private.position_of(id));
                    let wanted = {
                        let mut s = state.borrow_mut();
                        s.bucket.as_mut().map(|b| b.insert(doc))
                    };
                    // A missing position is tolerated as a no-op move
                    if let (Some(current), Some(wanted)) = (current, wanted) {
                        if current != wanted {
                            private.relocate(current, wanted);
                        }
                    }
                }
            }
            ChainPacket::Remove { query, .. } => {
                let private = state.borrow().private_data.clone();
                let removed = private.remove(query);
                let mut s = state.borrow_mut();
                if let Some(bucket) = s.bucket.as_mut() {
                    for doc in &removed {
                        bucket.remove(doc);
                    }
                }
            }
            ChainPacket::PrimaryKey { field } => {
                let private = state.borrow().private_data.clone();
                private.set_primary_key(field.clone());
                let mut s = state.borrow_mut();
                if let Some(bucket) = s.bucket.as_mut() {
                    bucket.set_primary_key(field.clone());
                }
            }
        }
    }

    /// Rebuilds or clears the active bucket to match the current query
    /// options and private data order.
    fn rebuild_bucket(&self) {
        Self::rebuild_bucket_in(&self.inner);
    }

    fn rebuild_bucket_in(state: &Rc<RefCell<ViewState>>) {
        let (spec, private, pk) = {
            let s = state.borrow();
            (
                s.options.order_by.clone(),
                s.private_data.clone(),
                s.private_data.primary_key(),
            )
        };
        let bucket = spec.map(|spec| {
            let mut bucket = ActiveBucket::new(spec);
            bucket.set_primary_key(pk);
            bucket.rebuild_from(&private.contents());
            bucket
        });
        state.borrow_mut().bucket = bucket;
    }

    // ---------------------------------------------------------------
    // Query API
    // ---------------------------------------------------------------

    /// Re-seeds the private data from the source under the current query
    /// settings and rebuilds the active bucket.
    pub fn refresh(&self) {
        if self.is_dropped() {
            return;
        }
        let (source, query, options, private) = {
            let s = self.inner.borrow();
            (
                s.source.clone(),
                s.query.clone().unwrap_or_default(),
                s.options.clone(),
                s.private_data.clone(),
            )
        };
        let Some(source) = source else {
            return;
        };
        private.remove(&Document::new());
        let results = source.find(&query, &options);
        self.inner.borrow_mut().last_cursor = source.cursor();
        private.insert_many(results);
        self.rebuild_bucket();
    }

    /// Replaces the query. Refreshes by default and emits `queryChange`.
    pub fn query(&self, query: Document, refresh: bool) {
        if self.is_dropped() {
            return;
        }
        self.inner.borrow_mut().query = Some(query);
        if refresh {
            self.refresh();
        }
        self.emit("queryChange");
    }

    /// Replaces the query and options together, refreshing once.
    pub fn query_with(&self, query: Document, options: QueryOptions, refresh: bool) {
        if self.is_dropped() {
            return;
        }
        {
            let mut state = self.inner.borrow_mut();
            state.query = Some(query);
            state.options = options;
        }
        if refresh {
            self.refresh();
        } else {
            self.rebuild_bucket();
        }
        self.emit("queryChange");
        self.emit("queryOptionsChange");
    }

    /// Merges keys into the query. With `overwrite` false, existing keys
    /// are kept.
    pub fn query_add(&self, patch: &Document, overwrite: bool, refresh: bool) {
        if self.is_dropped() {
            return;
        }
        {
            let mut state = self.inner.borrow_mut();
            let query = state.query.get_or_insert_with(Document::new);
            for (key, value) in patch.iter() {
                if overwrite || !query.contains_key(key) {
                    query.insert(key, value.clone());
                }
            }
        }
        if refresh {
            self.refresh();
        }
        self.emit("queryChange");
    }

    /// Deletes the patch's keys from the query.
    pub fn query_remove(&self, patch: &Document, refresh: bool) {
        if self.is_dropped() {
            return;
        }
        {
            let mut state = self.inner.borrow_mut();
            if let Some(query) = state.query.as_mut() {
                for (key, _) in patch.iter() {
                    query.remove(key);
                }
            }
        }
        if refresh {
            self.refresh();
        }
        self.emit("queryChange");
    }

    /// Replaces the query options. Refreshes by default and emits
    /// `queryOptionsChange`.
    pub fn query_options(&self, options: QueryOptions, refresh: bool) {
        if self.is_dropped() {
            return;
        }
        self.inner.borrow_mut().options = options;
        if refresh {
            self.refresh();
        } else {
            self.rebuild_bucket();
        }
        self.emit("queryOptionsChange");
    }

    /// Sets the ordering spec.
    pub fn order_by(&self, spec: IndexSpec) {
        let mut options = self.current_options();
        options.order_by = Some(spec);
        self.query_options(options, true);
    }

    // ---------------------------------------------------------------
    // Paging
    // ---------------------------------------------------------------

    /// Moves to the given page and refreshes.
    pub fn page(&self, page: usize) {
        if self.is_dropped() {
            return;
        }
        self.inner.borrow_mut().options.page = Some(page);
        self.refresh();
    }

    /// Moves to the first page.
    pub fn page_first(&self) {
        self.page(0);
    }

    /// Moves to the last page known to the cursor.
    pub fn page_last(&self) {
        let pages = self.cursor().pages;
        self.page(pages.saturating_sub(1));
    }

    /// Moves by a signed page delta, clamped to the cursor's range.
    pub fn page_scan(&self, delta: i64) {
        let cursor = self.cursor();
        let current = self.inner.borrow().options.page.unwrap_or(cursor.page) as i64;
        let last = cursor.pages.saturating_sub(1) as i64;
        let next = (current + delta).clamp(0, last);
        self.page(next as usize);
    }

    /// Returns the cursor recorded at the most recent seed or refresh.
    pub fn cursor(&self) -> Cursor {
        self.inner.borrow().last_cursor
    }

    // ---------------------------------------------------------------
    // Reads (delegate to the public projection)
    // ---------------------------------------------------------------

    /// Finds documents in the view's projection.
    pub fn find(&self, query: &Document, options: &QueryOptions) -> Vec<Document> {
        self.public_data().find(query, options)
    }

    /// Returns every document in the view's projection.
    pub fn find_all(&self) -> Vec<Document> {
        self.find(&Document::new(), &QueryOptions::default())
    }

    /// Finds the first matching document.
    pub fn find_one(&self, query: &Document, options: &QueryOptions) -> Option<Document> {
        self.public_data().find_one(query, options)
    }

    /// Finds the document with the given primary key.
    pub fn find_by_id(&self, id: &Value) -> Option<Document> {
        self.public_data().find_by_id(id)
    }

    /// Finds sub-documents under a path.
    pub fn find_sub(&self, path: &str, query: &Document) -> Vec<Document> {
        self.public_data().find_sub(path, query)
    }

    /// Finds the first matching sub-document.
    pub fn find_sub_one(&self, path: &str, query: &Document) -> Option<Document> {
        self.public_data().find_sub_one(path, query)
    }

    /// Returns the distinct values at a path.
    pub fn distinct(&self, path: &str) -> Vec<Value> {
        self.public_data().distinct(path)
    }

    /// Returns the documents a predicate accepts.
    pub fn filter<F>(&self, pred: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        self.public_data().filter(pred)
    }

    /// Returns the number of documents in the projection.
    pub fn count(&self) -> usize {
        self.public_data().count()
    }

    /// Returns the matching documents without pagination.
    pub fn subset(&self, query: &Document, options: &QueryOptions) -> Vec<Document> {
        self.public_data().subset(query, options)
    }

    /// Ensures an index on the private data.
    pub fn ensure_index(&self, spec: IndexSpec) -> bool {
        self.private_data().ensure_index(spec)
    }

    // ---------------------------------------------------------------
    // Writes (pass through to the source)
    // ---------------------------------------------------------------

    /// Inserts through the bound source; the document re-enters the view
    /// via the chain.
    pub fn insert(&self, doc: Document) -> Option<Document> {
        self.source_handle()?.insert(doc)
    }

    /// Updates through the bound source.
    pub fn update(&self, query: &Document, update: &Document) -> Vec<Document> {
        match self.source_handle() {
            Some(source) => source.update(query, update),
            None => Vec::new(),
        }
    }

    /// Updates by primary key through the bound source.
    pub fn update_by_id(&self, id: &Value, update: &Document) -> bool {
        match self.source_handle() {
            Some(source) => source.update_by_id(id, update),
            None => false,
        }
    }

    /// Removes through the bound source.
    pub fn remove(&self, query: &Document) -> Vec<Document> {
        match self.source_handle() {
            Some(source) => source.remove(query),
            None => Vec::new(),
        }
    }

    /// Returns the bound source, if any.
    pub fn source(&self) -> Option<Collection> {
        self.inner.borrow().source.clone()
    }

    fn source_handle(&self) -> Option<Collection> {
        let state = self.inner.borrow();
        if state.phase == ViewPhase::Dropped {
            return None;
        }
        state.source.clone()
    }

    // ---------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------

    /// Configures the transform pipeline.
    ///
    /// Enabling allocates the public collection, mirrors every private
    /// packet into it, and seeds it from the private data. Disabling
    /// tears the projection down.
    pub fn transform(&self, settings: TransformSettings) {
        if self.is_dropped() {
            return;
        }
        self.teardown_transform();
        if !settings.enabled {
            self.inner.borrow_mut().transform = settings;
            return;
        }

        let (name, private) = {
            let s = self.inner.borrow();
            (s.name.clone(), s.private_data.clone())
        };
        let public = Collection::new(format!("{}_internalPublic", name));
        public.set_primary_key(private.primary_key());
        public.set_transform(settings.clone());

        // Mirror every private packet onto the public collection. The
        // public collection re-emits its own packets, so the original is
        // consumed here to keep downstream observers single-sourced.
        let mirror_target = public.clone();
        let mirror_io = ReactorIO::new(&private.node(), &public.node(), move |_, packet| {
            match packet {
                ChainPacket::SetData { docs, .. } => {
                    mirror_target.set_data(docs.iter().map(Document::decouple).collect());
                }
                ChainPacket::Insert { docs, .. } => {
                    mirror_target.insert_many(docs.iter().map(Document::decouple).collect());
                }
                ChainPacket::Update { query, update, .. } => {
                    mirror_target.update(query, update);
                }
                ChainPacket::Remove { query, .. } => {
                    mirror_target.remove(query);
                }
                ChainPacket::PrimaryKey { field } => {
                    mirror_target.set_primary_key(field.clone());
                }
            }
            true
        });

        public.set_data(private.contents());
        let mut state = self.inner.borrow_mut();
        state.transform = settings;
        state.public_data = Some(public);
        state.mirror_io = Some(mirror_io);
    }

    /// Returns true if the transform pipeline is enabled.
    pub fn is_transform_enabled(&self) -> bool {
        self.inner.borrow().transform.enabled
    }

    fn teardown_transform(&self) {
        let (io, public) = {
            let mut state = self.inner.borrow_mut();
            state.transform = TransformSettings::default();
            (state.mirror_io.take(), state.public_data.take())
        };
        drop(io);
        if let Some(public) = public {
            public.drop_collection();
        }
    }

    // ---------------------------------------------------------------
    // Events and lifecycle
    // ---------------------------------------------------------------

    /// Registers an event listener on the view.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn() + 'static,
    {
        self.private_data().on(event, callback)
    }

    /// Unregisters an event listener.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.private_data().off(event, id)
    }

    // View events ride the private collection's emitter
    fn emit(&self, event: &str) {
        let private = self.inner.borrow().private_data.clone();
        private.emit_event(event);
    }

    /// Drops the view: detaches from the source, tears down the chain
    /// plumbing and both collections, deregisters the name, and emits
    /// `drop`. Idempotent; returns false on repeat.
    pub fn drop_view(&self) -> bool {
        if self.is_dropped() {
            return false;
        }
        self.inner.borrow_mut().phase = ViewPhase::Dropped;
        self.unbind();
        self.teardown_transform();

        let snapshot = {
            let s = self.inner.borrow();
            (s.db.clone(), s.name.clone(), s.private_data.clone())
        };
        let (db, name, private) = snapshot;
        if let Some(db) = db.and_then(|w| w.upgrade()) {
            db.borrow_mut().forget_view(&name);
        }
        // Dropping the private collection fires "drop" to view listeners
        private.drop_collection();
        true
    }
}

impl core::fmt::Debug for View {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("View")
            .field("name", &state.name)
            .field("phase", &state.phase)
            .field("count", &state.private_data.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;

    fn person(id: i64, age: i64) -> Document {
        Document::new()
            .with("_id", Value::from(id))
            .with("age", Value::from(age))
    }

    fn age_gte(n: i64) -> Document {
        Document::new().with(
            "age",
            Value::Object(Document::new().with("$gte", Value::from(n))),
        )
    }

    fn ids(docs: &[Document]) -> Vec<i64> {
        docs.iter()
            .map(|d| d.get("_id").and_then(Value::as_i64).unwrap())
            .collect()
    }

    #[test]
    fn test_unbound_view() {
        let view = View::new("empty");
        assert_eq!(view.phase(), ViewPhase::Initialised);
        assert!(!view.is_dropped());
        assert!(view.find_all().is_empty());
        assert!(view.source().is_none());

        // Writes without a source are sentinel no-ops
        assert!(view.insert(person(1, 1)).is_none());
        assert!(view.update(&Document::new(), &Document::new()).is_empty());
        assert!(view.remove(&Document::new()).is_empty());
    }

    #[test]
    fn test_from_seeds_and_filters() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 20), person(2, 30), person(3, 40)]);

        let view = View::with_query("adults", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);

        assert_eq!(view.phase(), ViewPhase::Bound);
        assert_eq!(ids(&view.find_all()), vec![2, 3]);
        assert_eq!(users.attached_view_count(), 1);
    }

    #[test]
    fn test_live_insert_gating() {
        let users = Collection::new("users");
        let view = View::with_query("adults", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);

        users.insert(person(1, 50));
        users.insert(person(2, 10));
        assert_eq!(ids(&view.find_all()), vec![1]);
    }

    #[test]
    fn test_no_query_passes_everything() {
        let users = Collection::new("users");
        let view = View::new("all");
        view.from(&users);

        users.insert_many(vec![person(1, 1), person(2, 2)]);
        users.remove(&Document::new().with("_id", Value::from(1)));
        assert_eq!(ids(&view.find_all()), vec![2]);
    }

    #[test]
    fn test_update_shrinks_view() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 30), person(2, 40)]);

        let view = View::with_query("adults", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);
        assert_eq!(view.count(), 2);

        users.update_by_id(&Value::from(1), &Document::new().with("age", Value::from(5)));
        assert_eq!(ids(&view.find_all()), vec![2]);
    }

    #[test]
    fn test_update_grows_view() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 10), person(2, 40)]);

        let view = View::with_query("adults", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);
        assert_eq!(view.count(), 1);

        users.update_by_id(&Value::from(1), &Document::new().with("age", Value::from(35)));
        let mut got = ids(&view.find_all());
        got.sort();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn test_update_within_view_applies() {
        let users = Collection::new("users");
        users.insert(person(1, 30));

        let view = View::with_query("adults", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);

        users.update_by_id(&Value::from(1), &Document::new().with("age", Value::from(31)));
        let doc = view.find_by_id(&Value::from(1)).unwrap();
        assert_eq!(doc.get("age"), Some(&Value::from(31)));
    }

    #[test]
    fn test_write_passthrough_reenters_via_chain() {
        let users = Collection::new("users");
        let view = View::with_query("adults", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);

        view.insert(person(1, 30));
        view.insert(person(2, 10));

        // Both landed in the source; only one survived the gate
        assert_eq!(users.count(), 2);
        assert_eq!(ids(&view.find_all()), vec![1]);

        view.update_by_id(&Value::from(1), &Document::new().with("age", Value::from(20)));
        assert!(view.find_all().is_empty());
        assert_eq!(users.count(), 2);

        view.remove(&Document::new());
        assert_eq!(users.count(), 0);
    }

    #[test]
    fn test_rebind_disposes_old_binding() {
        let first = Collection::new("first");
        let second = Collection::new("second");
        first.insert(person(1, 30));
        second.insert(person(2, 30));

        let view = View::new("v");
        view.from(&first);
        assert_eq!(ids(&view.find_all()), vec![1]);
        assert_eq!(first.node().downstream_count(), 1);

        view.from(&second);
        assert_eq!(ids(&view.find_all()), vec![2]);
        assert_eq!(first.node().downstream_count(), 0);
        assert_eq!(first.attached_view_count(), 0);

        // Mutations on the old source no longer reach the view
        first.insert(person(3, 30));
        assert_eq!(ids(&view.find_all()), vec![2]);
    }

    #[test]
    fn test_query_change_refreshes_and_emits() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 20), person(2, 30)]);

        let view = View::new("v");
        view.from(&users);
        assert_eq!(view.count(), 2);

        let fired = Rc::new(Cell::new(0));
        let fired_clone = fired.clone();
        view.on("queryChange", move || fired_clone.set(fired_clone.get() + 1));

        view.query(age_gte(25), true);
        assert_eq!(ids(&view.find_all()), vec![2]);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_query_add_and_remove() {
        let users = Collection::new("users");
        users.insert_many(vec![
            person(1, 20).with("active", Value::from(true)),
            person(2, 30).with("active", Value::from(true)),
            person(3, 40).with("active", Value::from(false)),
        ]);

        let view = View::with_query("v", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);
        assert_eq!(view.count(), 2);

        view.query_add(
            &Document::new().with("active", Value::from(true)),
            true,
            true,
        );
        assert_eq!(ids(&view.find_all()), vec![2]);

        view.query_remove(&Document::new().with("age", Value::Null), true);
        let mut got = ids(&view.find_all());
        got.sort();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn test_query_add_no_overwrite() {
        let view = View::with_query(
            "v",
            Some(Document::new().with("a", Value::from(1))),
            QueryOptions::default(),
        );
        view.query_add(&Document::new().with("a", Value::from(2)), false, false);
        assert_eq!(
            view.current_query().unwrap().get("a"),
            Some(&Value::from(1))
        );
    }

    #[test]
    fn test_ordered_view_inserts() {
        let users = Collection::new("users");
        let view = View::with_query(
            "sorted",
            None,
            QueryOptions::new().order_by(IndexSpec::asc("age")),
        );
        view.from(&users);

        users.insert(person(1, 30));
        users.insert(person(2, 10));
        users.insert(person(3, 20));

        let ages: Vec<i64> = view
            .private_data()
            .contents()
            .iter()
            .map(|d| d.get("age").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(ages, vec![10, 20, 30]);
    }

    #[test]
    fn test_ordered_view_update_moves() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 10), person(2, 20), person(3, 30)]);

        let view = View::with_query(
            "sorted",
            None,
            QueryOptions::new().order_by(IndexSpec::asc("age")),
        );
        view.from(&users);

        users.update_by_id(&Value::from(3), &Document::new().with("age", Value::from(5)));

        assert_eq!(ids(&view.private_data().contents()), vec![3, 1, 2]);
    }

    #[test]
    fn test_ordered_view_remove_forgets() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 10), person(2, 20)]);

        let view = View::with_query(
            "sorted",
            None,
            QueryOptions::new().order_by(IndexSpec::asc("age")),
        );
        view.from(&users);

        users.remove(&Document::new().with("_id", Value::from(1)));
        users.insert(person(3, 5));
        assert_eq!(ids(&view.private_data().contents()), vec![3, 2]);
    }

    #[test]
    fn test_pagination() {
        let users = Collection::new("users");
        users.insert_many((0..10).map(|i| person(i, i)).collect());

        let view = View::with_query(
            "paged",
            None,
            QueryOptions::new()
                .order_by(IndexSpec::asc("age"))
                .limit(3),
        );
        view.from(&users);

        assert_eq!(view.cursor().pages, 4);
        assert_eq!(ids(&view.find_all()), vec![0, 1, 2]);

        view.page(1);
        assert_eq!(ids(&view.find_all()), vec![3, 4, 5]);

        view.page_last();
        assert_eq!(ids(&view.find_all()), vec![9]);

        view.page_scan(-1);
        assert_eq!(ids(&view.find_all()), vec![6, 7, 8]);

        view.page_first();
        assert_eq!(ids(&view.find_all()), vec![0, 1, 2]);

        // Scanning past the edges clamps
        view.page_scan(-5);
        assert_eq!(view.cursor().page, 0);
    }

    #[test]
    fn test_transform_projection() {
        let users = Collection::new("users");
        let view = View::new("v");
        view.from(&users);
        view.transform(TransformSettings::new().enabled(true).data_in(|doc| {
            let upper = doc
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.to_uppercase())
                .unwrap_or_default();
            doc.decouple().with("upper", Value::from(upper))
        }));
        assert!(view.is_transform_enabled());

        users.insert(
            Document::new()
                .with("_id", Value::from(1))
                .with("name", Value::from("foo")),
        );

        let docs = view.find_all();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("name"), Some(&Value::from("foo")));
        assert_eq!(docs[0].get("upper"), Some(&Value::from("FOO")));

        // The private data is untransformed
        let private = view.private_data().contents();
        assert!(private[0].get("upper").is_none());
    }

    #[test]
    fn test_transform_disable_reverts_reads() {
        let users = Collection::new("users");
        users.insert(person(1, 1));

        let view = View::new("v");
        view.from(&users);
        view.transform(
            TransformSettings::new()
                .enabled(true)
                .data_in(|d| d.decouple().with("x", Value::from(1))),
        );
        assert_eq!(view.find_all()[0].get("x"), Some(&Value::from(1)));

        view.transform(TransformSettings::new());
        assert!(!view.is_transform_enabled());
        assert!(view.find_all()[0].get("x").is_none());
    }

    #[test]
    fn test_source_drop_detaches_but_keeps_data() {
        let users = Collection::new("users");
        users.insert(person(1, 30));

        let view = View::new("v");
        view.from(&users);
        assert_eq!(view.count(), 1);

        users.drop_collection();

        assert!(view.source().is_none());
        assert!(!view.is_dropped());
        assert_eq!(ids(&view.find_all()), vec![1]);

        // Dropping afterwards completes without error
        assert!(view.drop_view());
    }

    #[test]
    fn test_drop_view_lifecycle() {
        let users = Collection::new("users");
        users.insert(person(1, 30));

        let view = View::new("v");
        view.from(&users);
        assert_eq!(users.attached_view_count(), 1);

        let dropped = Rc::new(Cell::new(false));
        let dropped_clone = dropped.clone();
        view.on("drop", move || dropped_clone.set(true));

        assert!(view.drop_view());
        assert!(dropped.get());
        assert!(view.is_dropped());
        assert_eq!(view.phase(), ViewPhase::Dropped);
        assert_eq!(users.attached_view_count(), 0);
        assert!(view.find_all().is_empty());

        // Second drop reports failure
        assert!(!view.drop_view());

        // Post-drop operations are safe no-ops
        view.query(age_gte(1), true);
        view.refresh();
        assert!(view.insert(person(9, 9)).is_none());
        users.insert(person(2, 40));
        assert!(view.find_all().is_empty());
    }

    #[test]
    fn test_refresh_after_external_mutation() {
        let users = Collection::new("users");
        let view = View::with_query("v", Some(age_gte(25)), QueryOptions::default());
        view.from(&users);

        users.insert(person(1, 30));
        view.refresh();
        assert_eq!(ids(&view.find_all()), vec![1]);
    }

    #[test]
    fn test_ensure_index_delegates() {
        let view = View::new("v");
        assert!(view.ensure_index(IndexSpec::asc("age")));
        assert_eq!(view.private_data().index_count(), 1);
    }

    #[test]
    fn test_order_by_resorts() {
        let users = Collection::new("users");
        users.insert_many(vec![person(1, 30), person(2, 10)]);

        let view = View::new("v");
        view.from(&users);

        let fired = Rc::new(Cell::new(0));
        let fired_clone = fired.clone();
        view.on("queryOptionsChange", move || {
            fired_clone.set(fired_clone.get() + 1)
        });

        view.order_by(IndexSpec::asc("age"));
        assert_eq!(ids(&view.private_data().contents()), vec![2, 1]);
        assert_eq!(fired.get(), 1);

        users.insert(person(3, 20));
        assert_eq!(ids(&view.private_data().contents()), vec![2, 3, 1]);
    }
}
