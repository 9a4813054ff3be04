use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use crate::errors::ScanhiveError;

/// SQLite-backed result store. Cloning shares the same connection.
pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, ScanhiveError> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ScanhiveError::Database(format!("Failed to open database: {}", e)))?;

        // WAL so readers are not blocked while a scan is writing findings
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| ScanhiveError::Database(format!("Failed to set pragmas: {}", e)))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| ScanhiveError::Database(format!("Failed to set busy timeout: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        tracing::debug!(path, "Opened result store");
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, ScanhiveError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ScanhiveError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), ScanhiveError> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ScanhiveError::Database(format!("Failed to enable foreign keys: {}", e)))?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| ScanhiveError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, ScanhiveError> {
        self.conn
            .lock()
            .map_err(|_| ScanhiveError::Database("connection lock poisoned".into()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}
