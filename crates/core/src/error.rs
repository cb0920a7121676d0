//! Error types for tarn.

use alloc::string::String;
use core::fmt;

/// Result type alias for tarn operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for tarn database operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A view or collection name is already registered.
    NameConflict { name: String },
    /// A named entity could not be resolved.
    NotFound { name: String },
    /// Operation on an entity that has been dropped.
    Dropped { what: String },
    /// The view has no bound source.
    NoSource { view: String },
    /// The collection is not attached to a database.
    NoDatabase { collection: String },
    /// A chain packet or payload was malformed.
    InvalidPayload { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NameConflict { name } => {
                write!(f, "Name already in use: {}", name)
            }
            Error::NotFound { name } => {
                write!(f, "Not found: {}", name)
            }
            Error::Dropped { what } => {
                write!(f, "Operation on dropped entity: {}", what)
            }
            Error::NoSource { view } => {
                write!(f, "View has no bound source: {}", view)
            }
            Error::NoDatabase { collection } => {
                write!(f, "Collection not attached to a database: {}", collection)
            }
            Error::InvalidPayload { reason } => {
                write!(f, "Invalid payload: {}", reason)
            }
        }
    }
}

impl Error {
    /// Creates a name conflict error.
    pub fn name_conflict(name: impl Into<String>) -> Self {
        Error::NameConflict { name: name.into() }
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Error::NotFound { name: name.into() }
    }

    /// Creates a dropped-entity error.
    pub fn dropped(what: impl Into<String>) -> Self {
        Error::Dropped { what: what.into() }
    }

    /// Creates a no-source error.
    pub fn no_source(view: impl Into<String>) -> Self {
        Error::NoSource { view: view.into() }
    }

    /// Creates a no-database error.
    pub fn no_database(collection: impl Into<String>) -> Self {
        Error::NoDatabase {
            collection: collection.into(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Error::InvalidPayload {
            reason: reason.into(),
        }
    }
}
