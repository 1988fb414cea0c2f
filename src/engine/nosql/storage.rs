//! File Cluster
//!
//! Entry point for the file backend: a directory with `_meta.json` and one
//! sub-directory per bucket.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::collection::FileBucket;
use super::meta::Meta;
use super::DocumentCluster;
use crate::engine::error::{EntityKind, Result, StoreError};

const URL_SCHEME: &str = "file://";

/// An authenticated session against a file cluster
#[derive(Debug)]
pub struct FileCluster {
    base_path: PathBuf,
    meta: Meta,
}

/// Strip an optional `file://` scheme
pub fn cluster_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix(URL_SCHEME).unwrap_or(url))
}

impl FileCluster {
    /// Open and authenticate. Every failure here is a `Connection` error.
    pub fn connect(url: &str, user: &str, password: &str) -> Result<Self> {
        let base_path = cluster_path(url);

        if !Meta::exists(&base_path) {
            return Err(StoreError::Connection(format!(
                "no cluster at {}",
                base_path.display()
            )));
        }

        let meta = Meta::load(&base_path).map_err(|e| match e {
            StoreError::Connection(_) => e,
            other => StoreError::Connection(other.to_string()),
        })?;

        if !meta.verify(user, password) {
            return Err(StoreError::Connection(format!(
                "authentication failed for user {}",
                user
            )));
        }

        info!(path = %base_path.display(), user, "connected to file cluster");
        Ok(Self { base_path, meta })
    }

    /// Initialize a new cluster with one user
    pub fn create(path: &Path, user: &str, password: &str) -> Result<Self> {
        if Meta::exists(path) {
            return Err(StoreError::Conflict {
                kind: EntityKind::Cluster,
                name: path.display().to_string(),
            });
        }

        fs::create_dir_all(path)?;

        let mut meta = Meta::new();
        meta.set_user(user, password);
        meta.save(path)?;

        info!(path = %path.display(), user, "created file cluster");
        Ok(Self {
            base_path: path.to_path_buf(),
            meta,
        })
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn create_bucket(&self, name: &str) -> Result<FileBucket> {
        FileBucket::create(&self.base_path, name)
    }

    pub fn bucket_exists(&self, name: &str) -> bool {
        FileBucket::open(&self.base_path, name).is_ok()
    }

    /// List all buckets
    pub fn list_buckets(&self) -> Result<Vec<String>> {
        let mut buckets = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();

            if path.is_dir() {
                if let Some(name) = path.file_name() {
                    let name = name.to_string_lossy();
                    // Skip hidden directories
                    if !name.starts_with('.') && !name.starts_with('_') {
                        buckets.push(name.to_string());
                    }
                }
            }
        }

        buckets.sort();
        Ok(buckets)
    }
}

impl DocumentCluster for FileCluster {
    type Bucket = FileBucket;

    fn open_bucket(&self, name: &str) -> Result<FileBucket> {
        FileBucket::open(&self.base_path, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cluster_lifecycle() {
        let dir = tempdir().unwrap();

        let cluster = FileCluster::create(dir.path(), "admin", "secret").unwrap();
        assert!(cluster.list_buckets().unwrap().is_empty());

        cluster.create_bucket("users").unwrap();
        assert!(cluster.bucket_exists("users"));
        assert_eq!(cluster.list_buckets().unwrap(), vec!["users"]);

        let again = FileCluster::create(dir.path(), "admin", "secret").unwrap_err();
        assert!(again.is_conflict());
    }

    #[test]
    fn test_connect_authenticates() {
        let dir = tempdir().unwrap();
        FileCluster::create(dir.path(), "admin", "secret").unwrap();

        let url = format!("file://{}", dir.path().display());
        let cluster = FileCluster::connect(&url, "admin", "secret").unwrap();
        assert_eq!(cluster.path(), dir.path());

        let err = FileCluster::connect(&url, "admin", "nope").unwrap_err();
        assert!(matches!(err, StoreError::Connection(ref m) if m.contains("authentication")));
    }

    #[test]
    fn test_connect_missing_cluster() {
        let dir = tempdir().unwrap();
        let err = FileCluster::connect(dir.path().to_str().unwrap(), "a", "b").unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn test_corrupt_meta_is_connection_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("_meta.json"), "{not json").unwrap();
        let err = FileCluster::connect(dir.path().to_str().unwrap(), "a", "b").unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
