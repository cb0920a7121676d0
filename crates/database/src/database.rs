//! Database registry.
//!
//! A `Database` owns the name registries: one for collections, one for
//! views. View names are unique; creating a duplicate through the
//! collection factory fails loudly with a diagnostic naming the offender.
//! Deregistration is a side effect of dropping.

use crate::collection::Collection;
use crate::options::QueryOptions;
use crate::view::View;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use tarn_core::{Document, Error, Result};

/// Snapshot entry describing a registered view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewInfo {
    /// The registered name
    pub name: String,
    /// Documents currently in the view's projection
    pub count: usize,
    /// Whether the view is bound to a source
    pub linked: bool,
}

pub(crate) struct DatabaseState {
    name: String,
    collections: HashMap<String, Collection>,
    views: HashMap<String, View>,
}

impl DatabaseState {
    pub(crate) fn collection_handle(&self, name: &str) -> Option<Collection> {
        self.collections.get(name).cloned()
    }

    pub(crate) fn forget_collection(&mut self, name: &str) {
        self.collections.remove(name);
    }

    pub(crate) fn forget_view(&mut self, name: &str) {
        self.views.remove(name);
    }
}

/// The main database handle: a registry of collections and views.
#[derive(Clone)]
pub struct Database {
    inner: Rc<RefCell<DatabaseState>>,
}

impl Database {
    /// Creates a new empty database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DatabaseState {
                name: name.into(),
                collections: HashMap::new(),
                views: HashMap::new(),
            })),
        }
    }

    /// Returns the database name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    // ---------------------------------------------------------------
    // Collections
    // ---------------------------------------------------------------

    /// Returns the named collection, creating it on first use.
    pub fn collection(&self, name: &str) -> Collection {
        if let Some(existing) = self.inner.borrow().collections.get(name) {
            return existing.clone();
        }
        let collection = Collection::new(name);
        collection.attach_db(&Rc::downgrade(&self.inner));
        self.inner
            .borrow_mut()
            .collections
            .insert(name.to_string(), collection.clone());
        collection
    }

    /// Returns true if the named collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.inner.borrow().collections.contains_key(name)
    }

    /// Returns the registered collection names.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops the named collection. Returns false if it was not present.
    pub fn drop_collection(&self, name: &str) -> bool {
        let collection = self.inner.borrow().collections.get(name).cloned();
        match collection {
            Some(collection) => collection.drop_collection(),
            None => false,
        }
    }

    // ---------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------

    /// Returns the named view, lazily constructing an unbound one.
    pub fn view(&self, name: &str) -> View {
        if let Some(existing) = self.inner.borrow().views.get(name) {
            return existing.clone();
        }
        let view = View::new(name);
        view.attach_db(&Rc::downgrade(&self.inner));
        self.inner
            .borrow_mut()
            .views
            .insert(name.to_string(), view.clone());
        view
    }

    /// Returns true if the named view exists.
    pub fn view_exists(&self, name: &str) -> bool {
        self.inner.borrow().views.contains_key(name)
    }

    /// Returns a snapshot of the registered views.
    pub fn views(&self) -> Vec<ViewInfo> {
        let snapshot: Vec<(String, View)> = self
            .inner
            .borrow()
            .views
            .iter()
            .map(|(name, view)| (name.clone(), view.clone()))
            .collect();
        let mut infos: Vec<ViewInfo> = snapshot
            .into_iter()
            .map(|(name, view)| ViewInfo {
                name,
                count: view.count(),
                linked: view.source().is_some(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Constructs, binds and registers a view over a source collection.
    ///
    /// Fails loudly if the name is already registered.
    pub fn create_view(
        &self,
        source: &Collection,
        name: &str,
        query: Option<Document>,
        options: QueryOptions,
    ) -> Result<View> {
        if self.inner.borrow().views.contains_key(name) {
            return Err(Error::name_conflict(name));
        }
        let view = View::with_query(name, query, options);
        view.attach_db(&Rc::downgrade(&self.inner));
        self.inner
            .borrow_mut()
            .views
            .insert(name.to_string(), view.clone());
        view.from(source);
        Ok(view)
    }

    pub(crate) fn from_state(inner: Rc<RefCell<DatabaseState>>) -> Self {
        Self { inner }
    }
}

impl Collection {
    /// Creates a named view over this collection, registered with the
    /// owning database. Fails if the collection is detached or the name
    /// is taken.
    pub fn view(
        &self,
        name: &str,
        query: Option<Document>,
        options: QueryOptions,
    ) -> Result<View> {
        let state = self
            .db_handle()
            .ok_or_else(|| Error::no_database(self.name()))?;
        Database::from_state(state).create_view(self, name, query, options)
    }
}

impl core::fmt::Debug for Database {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Database")
            .field("name", &state.name)
            .field("collections", &state.collections.len())
            .field("views", &state.views.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::Value;

    fn person(id: i64, age: i64) -> Document {
        Document::new()
            .with("_id", Value::from(id))
            .with("age", Value::from(age))
    }

    #[test]
    fn test_collection_lazy_creation() {
        let db = Database::new("test");
        assert!(!db.collection_exists("users"));

        let users = db.collection("users");
        assert!(db.collection_exists("users"));

        // Same handle on repeat access
        users.insert(person(1, 20));
        assert_eq!(db.collection("users").count(), 1);
    }

    #[test]
    fn test_collection_names_sorted() {
        let db = Database::new("test");
        db.collection("zeta");
        db.collection("alpha");
        assert_eq!(db.collection_names(), ["alpha", "zeta"]);
    }

    #[test]
    fn test_drop_collection_deregisters() {
        let db = Database::new("test");
        db.collection("users");
        assert!(db.drop_collection("users"));
        assert!(!db.collection_exists("users"));
        assert!(!db.drop_collection("users"));
    }

    #[test]
    fn test_view_lazy_creation() {
        let db = Database::new("test");
        assert!(!db.view_exists("adults"));

        let view = db.view("adults");
        assert!(db.view_exists("adults"));
        assert_eq!(view.name(), "adults");

        // Unbound views report unlinked
        let infos = db.views();
        assert_eq!(infos.len(), 1);
        assert!(!infos[0].linked);
    }

    #[test]
    fn test_collection_view_factory() {
        let db = Database::new("test");
        let users = db.collection("users");
        users.insert(person(1, 30));

        let view = users.view("adults", None, QueryOptions::default()).unwrap();
        assert_eq!(view.count(), 1);
        assert!(db.view_exists("adults"));

        let infos = db.views();
        assert_eq!(infos[0].name, "adults");
        assert_eq!(infos[0].count, 1);
        assert!(infos[0].linked);
    }

    #[test]
    fn test_view_name_conflict_fails_loudly() {
        let db = Database::new("test");
        let users = db.collection("users");
        users.view("adults", None, QueryOptions::default()).unwrap();

        let err = users
            .view("adults", None, QueryOptions::default())
            .unwrap_err();
        assert_eq!(err, Error::name_conflict("adults"));
    }

    #[test]
    fn test_detached_collection_view_fails() {
        let users = Collection::new("users");
        let err = users.view("v", None, QueryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NoDatabase { .. }));
    }

    #[test]
    fn test_drop_view_deregisters() {
        let db = Database::new("test");
        let users = db.collection("users");
        let view = users.view("adults", None, QueryOptions::default()).unwrap();

        assert!(view.drop_view());
        assert!(!db.view_exists("adults"));

        // The name is reusable afterwards
        assert!(users.view("adults", None, QueryOptions::default()).is_ok());
    }
}
