//! SQLite-backed cache store.
//!
//! Persists resolution results across restarts. A single table keyed by the
//! cache key; insertion order is tracked by an autoincrement rowid so
//! oldest-first eviction survives a restart as well.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::store::{CacheStore, StoredEntry};
use crate::{CacheError, Result};

/// Embedded-DB implementation of [`CacheStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init_schema(&conn)?;
        info!(path = %path.as_ref().display(), "opened resolution cache database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory SQLite database, useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS resolution_cache (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                cache_key   TEXT NOT NULL UNIQUE,
                payload     TEXT NOT NULL,
                inserted_at INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Store("sqlite connection mutex poisoned".into()))
    }
}

impl CacheStore for SqliteStore {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        let conn = self.locked()?;
        let entry = conn
            .query_row(
                "SELECT cache_key, payload, inserted_at, expires_at
                 FROM resolution_cache WHERE cache_key = ?1",
                params![key],
                |row| {
                    Ok(StoredEntry {
                        key: row.get(0)?,
                        payload: row.get(1)?,
                        inserted_at: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn store(&self, entry: StoredEntry) -> Result<()> {
        let conn = self.locked()?;
        // delete-then-insert so a replaced key gets a fresh seq
        conn.execute(
            "DELETE FROM resolution_cache WHERE cache_key = ?1",
            params![entry.key],
        )?;
        conn.execute(
            "INSERT INTO resolution_cache (cache_key, payload, inserted_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.key, entry.payload, entry.inserted_at, entry.expires_at],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.locked()?;
        let removed = conn.execute(
            "DELETE FROM resolution_cache WHERE cache_key = ?1",
            params![key],
        )?;
        Ok(removed > 0)
    }

    fn remove_expired(&self, now: i64) -> Result<usize> {
        let conn = self.locked()?;
        let removed = conn.execute(
            "DELETE FROM resolution_cache WHERE expires_at < ?1",
            params![now],
        )?;
        Ok(removed)
    }

    fn remove_oldest(&self, count: usize) -> Result<usize> {
        let conn = self.locked()?;
        let removed = conn.execute(
            "DELETE FROM resolution_cache WHERE seq IN (
                SELECT seq FROM resolution_cache ORDER BY seq ASC LIMIT ?1
            )",
            params![count as i64],
        )?;
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.locked()?;
        conn.execute("DELETE FROM resolution_cache", [])?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let conn = self.locked()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resolution_cache", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    fn count_expired(&self, now: i64) -> Result<usize> {
        let conn = self.locked()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM resolution_cache WHERE expires_at < ?1",
            params![now],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.locked()?;
        // escape LIKE wildcards in the prefix itself
        let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM resolution_cache WHERE cache_key LIKE ?1 ESCAPE '\\'",
            params![format!("{}%", escaped)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
