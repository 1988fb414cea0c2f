//! SQLite Adapter
//!
//! Implements RelationalConnection for SQLite using rusqlite. The connection
//! url names a directory; every `<name>.db` file inside it is a database that
//! `select_database` can switch to. Until one is selected the session runs
//! against an in-memory database.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{RelationalConnection, ResultSet, SqlValue};
use crate::engine::error::{Result, StoreError};

const URL_SCHEME: &str = "sqlite://";
const MEMORY_URL: &str = ":memory:";

pub struct SqliteConnection {
    /// Directory holding the database files, `None` for a memory-only session
    root: Option<PathBuf>,
    conn: Connection,
    database: Option<String>,
}

impl SqliteConnection {
    /// Open a session rooted at `url` (`sqlite:///dir`, a bare directory, or
    /// `:memory:`). SQLite has no authentication, so credentials are accepted
    /// and ignored.
    pub fn open(url: &str, user: &str, _password: &str) -> Result<Self> {
        let location = url.strip_prefix(URL_SCHEME).unwrap_or(url);

        let root = if location == MEMORY_URL {
            None
        } else {
            let dir = PathBuf::from(location);
            if !dir.is_dir() {
                return Err(StoreError::Connection(format!(
                    "SQLite root is not a directory: {}",
                    dir.display()
                )));
            }
            Some(dir)
        };

        debug!(url, user, "opening sqlite session (credentials ignored)");
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            root,
            conn,
            database: None,
        })
    }

    /// Memory-only session with no selectable databases
    pub fn in_memory() -> Result<Self> {
        Self::open(MEMORY_URL, "", "")
    }

    fn database_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        let path = self.root.as_ref()?.join(format!("{}.db", name));
        path.is_file().then_some(path)
    }

    /// Map a raw SQLite value using the column's declared type
    fn to_sql_value(value: ValueRef<'_>, decl_type: Option<&str>) -> SqlValue {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => match decl_type {
                Some(t) if t.starts_with("BOOL") => SqlValue::Bool(i != 0),
                _ => SqlValue::Integer(i),
            },
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => {
                let text = String::from_utf8_lossy(t).into_owned();
                match decl_type {
                    Some("DATE") => match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
                        Ok(date) => SqlValue::Date(date),
                        Err(_) => SqlValue::Text(text),
                    },
                    Some("DATETIME") | Some("TIMESTAMP") => match parse_datetime(&text) {
                        Some(dt) => SqlValue::DateTime(dt),
                        None => SqlValue::Text(text),
                    },
                    _ => SqlValue::Text(text),
                }
            }
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn query_error(e: rusqlite::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

impl RelationalConnection for SqliteConnection {
    fn select_database(&mut self, name: &str) -> Result<()> {
        let path = self
            .database_path(name)
            .ok_or_else(|| StoreError::database_not_found(name))?;

        let next = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let previous = std::mem::replace(&mut self.conn, next);
        if let Err((_, e)) = previous.close() {
            warn!(error = %e, "failed to close previous sqlite database");
        }

        debug!(database = name, "selected sqlite database");
        self.database = Some(name.to_string());
        Ok(())
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        // The statement is finalized when it drops, on every return path
        let mut stmt = self.conn.prepare(sql).map_err(query_error)?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let decl_types: Vec<Option<String>> = stmt
            .columns()
            .iter()
            .map(|c| c.decl_type().map(|t| t.to_ascii_uppercase()))
            .collect();

        let mut rows = stmt.query([]).map_err(query_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, decl_type) in decl_types.iter().enumerate() {
                let value = row.get_ref(i).map_err(query_error)?;
                values.push(Self::to_sql_value(value, decl_type.as_deref()));
            }
            out.push(values);
        }

        Ok(ResultSet { columns, rows: out })
    }

    fn close(self: Box<Self>) -> Result<()> {
        debug!(database = ?self.database, "closing sqlite session");
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}
