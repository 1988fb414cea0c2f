//! Cluster meta information for the file backend
//!
//! Holds the format version and the credentials a session authenticates
//! against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::engine::error::{Result, StoreError};

pub const META_FILE: &str = "_meta.json";

/// Current format version supported by this backend
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Minimum format version we can read
pub const MIN_FORMAT_VERSION: u32 = 1;

/// Meta information stored in _meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub engine: String,

    pub format_version: u32,

    pub created_at: DateTime<Utc>,

    /// User name to SHA-256 of `user:password`
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

impl Meta {
    pub fn new() -> Self {
        Self {
            engine: "dbfacade-file".to_string(),
            format_version: CURRENT_FORMAT_VERSION,
            created_at: Utc::now(),
            users: BTreeMap::new(),
        }
    }

    pub fn exists(base_path: &Path) -> bool {
        base_path.join(META_FILE).is_file()
    }

    /// Load meta from a cluster directory and check its format version
    pub fn load(base_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(base_path.join(META_FILE))?;
        let meta: Meta = serde_json::from_str(&content)?;

        if meta.format_version < MIN_FORMAT_VERSION || meta.format_version > CURRENT_FORMAT_VERSION {
            return Err(StoreError::Connection(format!(
                "format version {} not supported (min: {}, max: {})",
                meta.format_version, MIN_FORMAT_VERSION, CURRENT_FORMAT_VERSION
            )));
        }

        Ok(meta)
    }

    pub fn save(&self, base_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_path.join(META_FILE), content)?;
        Ok(())
    }

    /// Add or replace a user's password
    pub fn set_user(&mut self, user: &str, password: &str) {
        self.users.insert(user.to_string(), hash_credentials(user, password));
    }

    pub fn verify(&self, user: &str, password: &str) -> bool {
        self.users
            .get(user)
            .is_some_and(|stored| *stored == hash_credentials(user, password))
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_credentials(user: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
