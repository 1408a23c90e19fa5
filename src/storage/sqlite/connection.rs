use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{RelayError, RelayResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    name TEXT PRIMARY KEY,
    sort_mode TEXT NOT NULL DEFAULT 'new',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS cursors (
    source_name TEXT PRIMARY KEY,
    last_item_id TEXT NOT NULL,
    last_seen_time INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (source_name) REFERENCES sources(name) ON DELETE CASCADE
);
"#;

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> RelayResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> RelayResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> RelayResult<Self> {
        check_integrity(&conn)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RelayError> {
        self.conn
            .lock()
            .map_err(|_| RelayError::Database(rusqlite::Error::InvalidQuery))
    }
}

/// A file that is not a database, or a damaged one, is fatal at startup
fn check_integrity(conn: &Connection) -> RelayResult<()> {
    let verdict: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| RelayError::StoreCorrupted(e.to_string()))?;

    if verdict == "ok" {
        Ok(())
    } else {
        Err(RelayError::StoreCorrupted(verdict))
    }
}
