//! Store Error Types
//!
//! Shared by the document and relational facades. Backend errors are wrapped
//! as-is; nothing here retries or recovers.

use std::fmt;
use std::io;
use thiserror::Error;

/// What kind of entity an operation expected to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Cluster,
    Collection,
    Document,
    Database,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Cluster => write!(f, "Cluster"),
            EntityKind::Collection => write!(f, "Collection"),
            EntityKind::Document => write!(f, "Document"),
            EntityKind::Database => write!(f, "Database"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    #[error("{kind} already exists: {name}")]
    Conflict { kind: EntityKind, name: String },

    #[error("Query error: {0}")]
    Query(String),

    #[error("Query returned no rows")]
    EmptyResult,

    #[error("No collection is open")]
    NoActiveCollection,

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn document_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: EntityKind::Document,
            name: id.to_string(),
        }
    }

    pub fn collection_not_found(name: &str) -> Self {
        StoreError::NotFound {
            kind: EntityKind::Collection,
            name: name.to_string(),
        }
    }

    pub fn database_not_found(name: &str) -> Self {
        StoreError::NotFound {
            kind: EntityKind::Database,
            name: name.to_string(),
        }
    }

    pub fn document_exists(id: &str) -> Self {
        StoreError::Conflict {
            kind: EntityKind::Document,
            name: id.to_string(),
        }
    }

    /// True for any `NotFound`, whatever the entity
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
