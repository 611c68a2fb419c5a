//! Key-value storage using SQLite

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use shelfscope_core::{Result, ShelfscopeError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::KeyValueStore;

fn storage_err(err: rusqlite::Error) -> ShelfscopeError {
    ShelfscopeError::Storage(err.to_string())
}

/// Handle for database connections - either owned or shared
enum ConnectionHandle {
    Owned(Connection),
    Shared(Arc<Mutex<Connection>>),
}

impl ConnectionHandle {
    fn with_conn<T, F: FnOnce(&Connection) -> rusqlite::Result<T>>(&self, f: F) -> Result<T> {
        match self {
            ConnectionHandle::Owned(conn) => f(conn).map_err(storage_err),
            ConnectionHandle::Shared(arc) => {
                let guard = arc.lock();
                f(&guard).map_err(storage_err)
            }
        }
    }
}

/// Durable store backed by a single SQLite table
pub struct SqliteStore {
    db_path: PathBuf,
    /// Holds the connection for in-memory databases (where each open creates a new db)
    memory_conn: Option<Arc<Mutex<Connection>>>,
}

impl SqliteStore {
    /// Open or create storage at the given path
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            db_path,
            memory_conn: None,
        };
        store.initialize_schema()?;
        tracing::debug!(path = %store.db_path.display(), "Opened key-value store");
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        let store = Self {
            db_path: PathBuf::from(":memory:"),
            memory_conn: Some(Arc::new(Mutex::new(conn))),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<ConnectionHandle> {
        if let Some(ref conn) = self.memory_conn {
            Ok(ConnectionHandle::Shared(conn.clone()))
        } else {
            let conn = Connection::open(&self.db_path).map_err(|e| {
                ShelfscopeError::Storage(format!(
                    "Failed to open database at {:?}: {}",
                    self.db_path, e
                ))
            })?;
            Ok(ConnectionHandle::Owned(conn))
        }
    }

    fn initialize_schema(&self) -> Result<()> {
        let handle = self.connect()?;
        handle.with_conn(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                [],
            )?;
            Ok(())
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let handle = self.connect()?;
        handle.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let handle = self.connect()?;
        let now = Utc::now().to_rfc3339();
        handle.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let handle = self.connect()?;
        handle.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
            Ok(affected > 0)
        })
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let handle = self.connect()?;
        handle.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut keys = Vec::new();
            for key in rows {
                let key = key?;
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
            Ok(keys)
        })
    }
}
