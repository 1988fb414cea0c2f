//! Document Store Client
//!
//! Forwards per-document operations and queries to the currently open
//! bucket.

use serde_json::Value;
use tracing::info;

use super::storage::FileCluster;
use super::{
    DocumentBody, DocumentBucket, DocumentCluster, DocumentMeta, MutationResult, QueryRows,
};
use crate::engine::error::{Result, StoreError};

/// What `get` should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Just the document body
    #[default]
    Value,
    /// Body plus store metadata
    Envelope,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFetchResult {
    Value(DocumentBody),
    Envelope {
        body: DocumentBody,
        meta: DocumentMeta,
    },
}

impl DocumentFetchResult {
    pub fn body(&self) -> &DocumentBody {
        match self {
            DocumentFetchResult::Value(body) => body,
            DocumentFetchResult::Envelope { body, .. } => body,
        }
    }

    pub fn into_body(self) -> DocumentBody {
        match self {
            DocumentFetchResult::Value(body) => body,
            DocumentFetchResult::Envelope { body, .. } => body,
        }
    }

    pub fn meta(&self) -> Option<&DocumentMeta> {
        match self {
            DocumentFetchResult::Value(_) => None,
            DocumentFetchResult::Envelope { meta, .. } => Some(meta),
        }
    }
}

/// Facade over one cluster session and at most one open bucket
pub struct DocumentStoreClient<C: DocumentCluster = FileCluster> {
    cluster: C,
    bucket: Option<C::Bucket>,
}

impl DocumentStoreClient<FileCluster> {
    /// Connect to a file cluster and optionally open a bucket
    pub fn connect(url: &str, user: &str, password: &str, bucket: Option<&str>) -> Result<Self> {
        let cluster = FileCluster::connect(url, user, password)?;
        Self::with_cluster(cluster, bucket)
    }
}

impl<C: DocumentCluster> DocumentStoreClient<C> {
    /// Wrap an already-authenticated cluster session
    pub fn with_cluster(cluster: C, bucket: Option<&str>) -> Result<Self> {
        let mut client = Self {
            cluster,
            bucket: None,
        };
        if let Some(name) = bucket.filter(|n| !n.is_empty()) {
            client.open_collection(name)?;
        }
        Ok(client)
    }

    /// Open a bucket and make it the active one
    pub fn open_collection(&mut self, name: &str) -> Result<()> {
        let bucket = self.cluster.open_bucket(name)?;
        info!(bucket = name, "opened bucket");
        self.bucket = Some(bucket);
        Ok(())
    }

    /// The open bucket, for direct access
    pub fn active_collection(&self) -> Result<&C::Bucket> {
        self.bucket.as_ref().ok_or(StoreError::NoActiveCollection)
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn get(&self, id: &str, mode: FetchMode) -> Result<DocumentFetchResult> {
        let doc = self.active_collection()?.get(id)?;
        Ok(match mode {
            FetchMode::Value => DocumentFetchResult::Value(doc.body),
            FetchMode::Envelope => DocumentFetchResult::Envelope {
                body: doc.body,
                meta: doc.meta,
            },
        })
    }

    /// Shorthand for `get(id, FetchMode::Value)`
    pub fn get_value(&self, id: &str) -> Result<DocumentBody> {
        Ok(self.get(id, FetchMode::Value)?.into_body())
    }

    /// Create the document, or replace it if it exists
    pub fn upsert(&self, id: &str, doc: &DocumentBody) -> Result<MutationResult> {
        self.active_collection()?.upsert(id, doc)
    }

    /// Replace an existing document
    pub fn update(&self, id: &str, doc: &DocumentBody) -> Result<MutationResult> {
        self.active_collection()?.replace(id, doc)
    }

    pub fn insert(&self, id: &str, doc: &DocumentBody) -> Result<MutationResult> {
        self.active_collection()?.insert(id, doc)
    }

    pub fn delete(&self, id: &str) -> Result<MutationResult> {
        self.active_collection()?.remove(id)
    }

    /// Lazy rows; re-run the query to iterate again
    pub fn query(&self, statement: &str) -> Result<QueryRows> {
        self.active_collection()?.query(statement)
    }

    pub fn query_all(&self, statement: &str) -> Result<Vec<Value>> {
        self.query(statement)?.collect()
    }

    /// First row only, `EmptyResult` if the query matches nothing
    pub fn query_single(&self, statement: &str) -> Result<Value> {
        self.query(statement)?.single()
    }
}
