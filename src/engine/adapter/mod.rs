//! Relational Adapter Layer
//!
//! A trait-based seam over relational drivers. The facade only needs a
//! handful of calls: select a database, run SQL and get columns plus rows
//! back, and close. SQLite is the bundled driver.

pub mod sqlite;

pub use sqlite::SqliteConnection;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};

use super::error::Result;

/// A single open connection to a relational backend
pub trait RelationalConnection {
    /// Switch the active database on this connection
    fn select_database(&mut self, name: &str) -> Result<()>;

    /// Name of the active database, if one is selected
    fn database(&self) -> Option<&str>;

    /// Execute SQL and collect every row. Any statement handle opened for the
    /// call must be released before returning, on success or failure.
    fn execute(&mut self, sql: &str) -> Result<ResultSet>;

    /// Close the connection. Consuming the box makes a second close
    /// impossible.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Column names and row tuples from one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// A single cell value as read from a relational driver
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
    /// Calendar date with no time or zone
    Date(NaiveDate),
    /// Left as ISO-8601 text; only plain dates become epoch milliseconds
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Convert to a JSON value. Dates become epoch milliseconds at midnight
    /// UTC; everything else keeps its shape.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => json!(i),
            SqlValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Blob(b) => json!(format!("BLOB({} bytes)", b.len())),
            SqlValue::Date(d) => json!(date_to_millis(*d)),
            SqlValue::DateTime(dt) => json!(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }
}

/// Epoch milliseconds at midnight UTC of `date`
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}
