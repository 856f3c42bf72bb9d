//! Durable key-value storage.
//!
//! A single SQLite table stands in for browser local storage: string keys,
//! string values, last-write-wins per key, synchronous read-after-write
//! within a session.

use crate::error::{ChatError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-backed string key-value store.
///
/// Thread-safe via an internal `Mutex<Connection>`; cloning shares the
/// connection.
#[derive(Clone)]
pub struct KvStore {
    conn: Arc<Mutex<Connection>>,
}

impl KvStore {
    /// Open (or create) the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| ChatError::Storage(format!("failed to open database: {e}")))?;
        Self::init(conn)
    }

    /// Open a private in-memory database (tests, throwaway sessions).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChatError::Storage(format!("failed to open database: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .map_err(|e| ChatError::Storage(format!("failed to apply schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ChatError::Storage("storage mutex poisoned".to_owned()))
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| ChatError::Storage(format!("read of '{key}' failed: {e}")))
    }

    /// Write a value, replacing any previous one.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| ChatError::Storage(format!("write of '{key}' failed: {e}")))?;
        Ok(())
    }

    /// Remove a key; removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| ChatError::Storage(format!("delete of '{key}' failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn read_after_write() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.set("greeting", "hello").unwrap();
        assert_eq!(kv.get("greeting").unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn last_write_wins() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.set("k", "first").unwrap();
        kv.set("k", "second").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn missing_key_is_none() {
        let kv = KvStore::open_in_memory().unwrap();
        assert!(kv.get("absent").unwrap().is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.set("k", "v").unwrap();
        kv.remove("k").unwrap();
        kv.remove("k").unwrap();
        assert!(kv.get("k").unwrap().is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let kv = KvStore::open(&path).unwrap();
            kv.set("persisted", "yes").unwrap();
        }
        let kv = KvStore::open(&path).unwrap();
        assert_eq!(kv.get("persisted").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn clones_share_the_store() {
        let kv = KvStore::open_in_memory().unwrap();
        let other = kv.clone();
        kv.set("shared", "1").unwrap();
        assert_eq!(other.get("shared").unwrap().as_deref(), Some("1"));
    }
}
