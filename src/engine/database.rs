//! Relational Store Client
//! Owns one relational connection and shapes query output as TabularResult

use tracing::{debug, info, warn};

use super::adapter::{RelationalConnection, SqliteConnection};
use super::error::{Result, StoreError};
use super::tabular::TabularResult;

pub struct RelationalStoreClient {
    /// `None` once the connection has been released
    conn: Option<Box<dyn RelationalConnection>>,
}

impl RelationalStoreClient {
    /// Connect with the bundled SQLite driver, optionally selecting a database
    pub fn connect(url: &str, user: &str, password: &str, database: Option<&str>) -> Result<Self> {
        let conn = SqliteConnection::open(url, user, password)?;
        info!(url, user, "relational connection opened");
        Self::with_connection(Box::new(conn), database)
    }

    /// Wrap an already-open connection
    pub fn with_connection(
        conn: Box<dyn RelationalConnection>,
        database: Option<&str>,
    ) -> Result<Self> {
        let mut client = Self { conn: Some(conn) };
        if let Some(name) = database.filter(|n| !n.is_empty()) {
            client.select_database(name)?;
        }
        Ok(client)
    }

    fn conn_mut(&mut self) -> Result<&mut Box<dyn RelationalConnection>> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Connection("connection already closed".to_string()))
    }

    pub fn select_database(&mut self, name: &str) -> Result<()> {
        self.conn_mut()?.select_database(name)
    }

    /// Active database name, if any
    pub fn database(&self) -> Option<&str> {
        self.conn.as_ref().and_then(|c| c.database())
    }

    /// Run `sql` and return every row
    pub fn fetch_all(&mut self, sql: &str) -> Result<TabularResult> {
        debug!(sql, "fetch_all");
        let set = self.conn_mut()?.execute(sql)?;
        TabularResult::try_from(set)
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Close the connection. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                info!("relational connection closed");
                conn.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for RelationalStoreClient {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close relational connection on drop");
        }
    }
}
