//! Document Store
//!
//! A facade over cluster/bucket document databases plus a bundled file-backed
//! backend:
//! - `DocumentCluster` / `DocumentBucket` are the driver seam
//! - `DocumentStoreClient` is the facade callers use
//! - `FileCluster` stores each bucket as a directory of JSON documents

pub mod client;
pub mod collection;
pub mod document;
pub mod meta;
pub mod query;
pub mod storage;

pub use client::{DocumentFetchResult, DocumentStoreClient, FetchMode};
pub use collection::FileBucket;
pub use meta::Meta;
pub use query::{Filter, FilterOp, Query};
pub use storage::FileCluster;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{Result, StoreError};

/// Schema-less document body
pub type DocumentBody = Map<String, Value>;

/// A connected, authenticated session
pub trait DocumentCluster {
    type Bucket: DocumentBucket;

    /// Open a named bucket, `NotFound` if it does not exist
    fn open_bucket(&self, name: &str) -> Result<Self::Bucket>;
}

/// Per-document operations on one open bucket
pub trait DocumentBucket {
    fn name(&self) -> &str;

    fn get(&self, id: &str) -> Result<StoredDocument>;

    /// Create only, `Conflict` if the id exists
    fn insert(&self, id: &str, body: &DocumentBody) -> Result<MutationResult>;

    /// Replace only, `NotFound` if the id is absent
    fn replace(&self, id: &str, body: &DocumentBody) -> Result<MutationResult>;

    fn upsert(&self, id: &str, body: &DocumentBody) -> Result<MutationResult>;

    fn remove(&self, id: &str) -> Result<MutationResult>;

    /// Run a backend-native query; the text is not interpreted by the facade
    fn query(&self, statement: &str) -> Result<QueryRows>;
}

/// Store metadata that travels alongside a document body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Compare-and-swap token, changes on every mutation
    pub cas: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A document as returned by a bucket read
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: DocumentBody,
    pub meta: DocumentMeta,
}

/// Outcome of a successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub id: String,
    pub cas: u64,
}

/// Finite, single-pass stream of query rows
pub struct QueryRows {
    rows: Box<dyn Iterator<Item = Result<Value>>>,
}

impl QueryRows {
    pub fn new(rows: impl Iterator<Item = Result<Value>> + 'static) -> Self {
        Self { rows: Box::new(rows) }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// First row, `EmptyResult` when there is none
    pub fn single(mut self) -> Result<Value> {
        self.next().unwrap_or(Err(StoreError::EmptyResult))
    }
}

impl Iterator for QueryRows {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}
