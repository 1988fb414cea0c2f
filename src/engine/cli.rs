//! dbfacade CLI Module
//! Command-line interface over the document and relational facades

pub mod formatter;

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use super::config::{Config, ConfigError};
use super::tabular::Record;

#[derive(Parser, Debug)]
#[command(name = "dbfacade")]
#[command(author = "dbfacade Team")]
#[command(version)]
#[command(about = "Thin facades over a document store and a relational store", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.dbfacade/dbfacade.config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relational store commands
    Sql {
        /// Password, overrides the config file
        #[arg(long, env = "DBFACADE_SQL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[command(subcommand)]
        action: SqlAction,
    },

    /// Document store commands
    Doc {
        /// Password, overrides the config file
        #[arg(long, env = "DBFACADE_DOC_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[command(subcommand)]
        action: DocAction,
    },

    /// Config file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SqlAction {
    /// Run a query and print every row as a record
    Fetch {
        /// SQL to execute
        sql: String,

        /// Database to select first
        #[arg(short, long)]
        database: Option<String>,

        /// Static property added to every record (KEY=VALUE, VALUE may be JSON)
        #[arg(short, long = "extra", value_parser = parse_key_value)]
        extra: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocAction {
    /// Create the cluster and a bucket at the configured url
    Init {
        /// Bucket to create (defaults to the configured bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// Fetch a document
    Get {
        id: String,

        /// Include store metadata
        #[arg(long)]
        envelope: bool,
    },

    /// Create a document, failing if it exists
    Insert {
        id: String,
        /// Document body as a JSON object
        json: String,
    },

    /// Replace an existing document
    Update {
        id: String,
        json: String,
    },

    /// Create or replace a document
    Upsert {
        id: String,
        json: String,
    },

    /// Delete a document
    Delete {
        id: String,
    },

    /// Run a query against the open bucket
    Query {
        query: String,

        /// Return only the first row
        #[arg(long)]
        single: bool,

        /// Bucket to query instead of the configured one
        #[arg(short, long)]
        bucket: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a config for local stores
    Init {
        /// Where the stores live (defaults to ~/.dbfacade/data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Print the active config (passwords omitted)
    Show,
}

impl Cli {
    pub fn config_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Build the extra-properties record. Values that parse as JSON keep their
/// type; anything else is a string.
pub fn extra_record(pairs: &[(String, String)]) -> Record {
    pairs
        .iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("documentType=employee").unwrap(),
            ("documentType".to_string(), "employee".to_string())
        );
        assert_eq!(parse_key_value("a=b=c").unwrap().1, "b=c");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_extra_record_types() {
        let pairs = vec![
            ("documentType".to_string(), "employee".to_string()),
            ("version".to_string(), "2".to_string()),
            ("archived".to_string(), "false".to_string()),
        ];
        let record = extra_record(&pairs);
        assert_eq!(record["documentType"], json!("employee"));
        assert_eq!(record["version"], json!(2));
        assert_eq!(record["archived"], json!(false));
    }

    #[test]
    fn test_cli_parses_fetch() {
        let cli = Cli::try_parse_from([
            "dbfacade",
            "--format",
            "json",
            "sql",
            "fetch",
            "SELECT * FROM employees LIMIT 2",
            "--database",
            "employees",
            "--extra",
            "documentType=employee",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Sql { action: SqlAction::Fetch { sql, database, extra }, .. } => {
                assert_eq!(sql, "SELECT * FROM employees LIMIT 2");
                assert_eq!(database.as_deref(), Some("employees"));
                assert_eq!(extra, vec![("documentType".to_string(), "employee".to_string())]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
