use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, OntographError};

pub mod migrate;

/// Pragmas applied to every connection.
/// Foreign keys must be on for cascade deletes to fire.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA busy_timeout = 5000;";

/// Database connection wrapper
///
/// Every call to [`Db::with_connection`] opens its own connection and drops it
/// when the closure returns, so each request gets a scoped session.
#[derive(Debug)]
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Path of the underlying SQLite file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new database connection with pragmas applied
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(OntographError::Database)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(conn)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(OntographError::Database)?;
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| OntographError::Config(format!("database task failed: {}", e)))?
    }
}
