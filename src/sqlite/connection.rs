//! Shared SQLite connection
//!
//! rusqlite is synchronous; every catalog read runs on the blocking pool
//! against a connection guarded by a mutex.

use crate::{Error, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A cloneable handle to one SQLite connection.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteConnection {
    /// Open a database file (creates it if it doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already opened connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Attach another database file under `schema`
    pub fn attach(&self, schema: &str, path: &Path) -> Result<()> {
        if schema.trim().is_empty() {
            return Err(Error::InvalidArgument("attached schema name must not be empty".to_string()));
        }
        let file = path.to_string_lossy();
        let sql = format!("ATTACH DATABASE ?1 AS \"{}\"", schema.replace('"', "\"\""));
        self.conn.lock().execute(&sql, [file.as_ref()])?;
        tracing::debug!(schema, path = %path.display(), "attached sqlite database");
        Ok(())
    }

    /// Run statements directly on the calling thread
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await?
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish()
    }
}
