//! dbfacade Configuration Module
//! Handles loading and saving dbfacade.config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "dbfacade.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Could not find home directory")]
    NoHomeDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub document: Option<DocumentStoreConfig>,
    #[serde(default)]
    pub relational: Option<RelationalStoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// e.g. file:///var/lib/dbfacade/cluster
    pub url: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalStoreConfig {
    /// e.g. sqlite:///var/lib/dbfacade/sql
    pub url: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
}

impl Config {
    /// `~/.dbfacade/dbfacade.config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".dbfacade").join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Local stores under `data_dir`
    pub fn default_local(data_dir: &Path) -> Self {
        Self {
            document: Some(DocumentStoreConfig {
                url: format!("file://{}", data_dir.join("documents").display()),
                username: "admin".to_string(),
                password: String::new(),
                bucket: Some("default".to_string()),
            }),
            relational: Some(RelationalStoreConfig {
                url: format!("sqlite://{}", data_dir.join("sql").display()),
                username: "admin".to_string(),
                password: String::new(),
                database: None,
            }),
        }
    }
}
