//! Bucket storage for the file backend
//!
//! A bucket is a directory; each document is `<sha256(id)>.json`, so any id
//! maps to a safe, fixed-length file name. The id itself lives in the file.
//! Writes go to a `.tmp` sibling first and are moved into place, so a failed
//! write never leaves a partial document behind.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::document::Document;
use super::query::Query;
use super::{DocumentBody, DocumentBucket, MutationResult, QueryRows, StoredDocument};
use crate::engine::error::{EntityKind, Result, StoreError};

/// An open bucket (like a table in SQL)
#[derive(Debug, Clone)]
pub struct FileBucket {
    name: String,
    path: PathBuf,
}

impl FileBucket {
    /// Open an existing bucket
    pub fn open(base_path: &Path, name: &str) -> Result<Self> {
        let path = base_path.join(name);

        if validate_bucket_name(name).is_err() || !path.is_dir() {
            return Err(StoreError::collection_not_found(name));
        }

        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    /// Create a new bucket
    pub fn create(base_path: &Path, name: &str) -> Result<Self> {
        validate_bucket_name(name)?;

        let path = base_path.join(name);

        if path.exists() {
            return Err(StoreError::Conflict {
                kind: EntityKind::Collection,
                name: name.to_string(),
            });
        }

        fs::create_dir_all(&path)?;

        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List all document IDs, sorted
    pub fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();

            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                match read_id(&path) {
                    Ok(id) => ids.push(id),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.list_ids()?.len())
    }

    fn doc_path(&self, id: &str) -> Result<PathBuf> {
        document_path(&self.path, id)
    }

    fn load(&self, id: &str) -> Result<Document> {
        load_document(&self.path, id)
    }

    /// Create or overwrite; the previous file stays intact if the write fails
    fn store(&self, doc: &Document) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)?;
        let target = self.doc_path(&doc.id)?;
        let staging = write_staged(&target, content.as_bytes())?;

        if let Err(e) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

impl DocumentBucket for FileBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, id: &str) -> Result<StoredDocument> {
        debug!(bucket = %self.name, id, "get");
        Ok(self.load(id)?.into())
    }

    fn insert(&self, id: &str, body: &DocumentBody) -> Result<MutationResult> {
        debug!(bucket = %self.name, id, "insert");
        let doc = Document::new(id, body.clone());
        let content = serde_json::to_string_pretty(&doc)?;

        let target = self.doc_path(id)?;
        let staging = write_staged(&target, content.as_bytes())?;

        // Linking fails if the target exists, so a complete file appears or nothing does
        let linked = fs::hard_link(&staging, &target);
        let _ = fs::remove_file(&staging);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::document_exists(id));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(MutationResult { id: doc.id, cas: doc.cas })
    }

    fn replace(&self, id: &str, body: &DocumentBody) -> Result<MutationResult> {
        debug!(bucket = %self.name, id, "replace");
        let mut doc = self.load(id)?;
        doc.replace(body.clone());
        self.store(&doc)?;
        Ok(MutationResult { id: doc.id, cas: doc.cas })
    }

    fn upsert(&self, id: &str, body: &DocumentBody) -> Result<MutationResult> {
        debug!(bucket = %self.name, id, "upsert");
        let doc = match self.load(id) {
            Ok(mut existing) => {
                existing.replace(body.clone());
                existing
            }
            Err(e) if e.is_not_found() => Document::new(id, body.clone()),
            Err(e) => return Err(e),
        };
        self.store(&doc)?;
        Ok(MutationResult { id: doc.id, cas: doc.cas })
    }

    fn remove(&self, id: &str) -> Result<MutationResult> {
        debug!(bucket = %self.name, id, "remove");
        let doc = self.load(id)?;
        fs::remove_file(self.doc_path(id)?)?;
        Ok(MutationResult { id: doc.id, cas: doc.cas })
    }

    fn query(&self, statement: &str) -> Result<QueryRows> {
        debug!(bucket = %self.name, statement, "query");
        let query = Query::parse(statement)?;
        let ids = self.list_ids()?;
        let path = self.path.clone();
        let docs = ids.into_iter().map(move |id| load_document(&path, &id));
        Ok(query.execute(docs))
    }
}

fn document_path(bucket_path: &Path, id: &str) -> Result<PathBuf> {
    if id.is_empty() {
        return Err(StoreError::InvalidDocumentId("id cannot be empty".to_string()));
    }
    let key = hex::encode(Sha256::digest(id.as_bytes()));
    Ok(bucket_path.join(format!("{}.json", key)))
}

/// Write `content` to the `.tmp` sibling of `target`, removing it on failure
fn write_staged(target: &Path, content: &[u8]) -> io::Result<PathBuf> {
    let staging = target.with_extension("tmp");
    if let Err(e) = fs::write(&staging, content) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    Ok(staging)
}

fn load_document(bucket_path: &Path, id: &str) -> Result<Document> {
    let content = match fs::read_to_string(document_path(bucket_path, id)?) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::document_not_found(id));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

#[derive(Deserialize)]
struct StoredId {
    #[serde(rename = "_id")]
    id: String,
}

fn read_id(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)?;
    let stored: StoredId = serde_json::from_str(&content)?;
    Ok(stored.id)
}

/// Validate bucket name
fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidCollectionName("name cannot be empty".to_string()));
    }

    if name.starts_with('_') {
        return Err(StoreError::InvalidCollectionName("name cannot start with underscore".to_string()));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(StoreError::InvalidCollectionName("name must be alphanumeric".to_string()));
    }

    Ok(())
}
