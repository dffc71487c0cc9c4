//! Durable cache backends
//!
//! A backend stores opaque rows: the two key hashes, a serialized payload and
//! the creation time in Unix milliseconds. Calls are blocking; the store moves
//! them onto the blocking thread pool.

use crate::error::{CacheError, Result};
use crate::hash::ContentHash;
use crate::key::CacheKey;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// A persisted cache row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Serialized payload (JSON)
    pub payload: String,
    /// Creation time, Unix milliseconds
    pub created_at_ms: i64,
}

/// Storage behind a [`CacheStore`](crate::CacheStore)
pub trait CacheBackend: Send + Sync + Debug + 'static {
    /// Row for `key`, regardless of age
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>>;

    /// Insert or replace the row for `key`
    ///
    /// # Errors
    /// Returns an error if the row cannot be written.
    fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()>;

    /// Delete the row for `key` if it still carries `created_at_ms`;
    /// `true` if a row was deleted
    ///
    /// A row rewritten since it was read is left alone.
    ///
    /// # Errors
    /// Returns an error if the row cannot be deleted.
    fn remove(&self, key: &CacheKey, created_at_ms: i64) -> Result<bool>;

    /// Delete every row created before `cutoff_ms`; returns how many
    ///
    /// # Errors
    /// Returns an error if the purge fails.
    fn purge_older_than(&self, cutoff_ms: i64) -> Result<usize>;

    /// Number of rows
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn len(&self) -> Result<usize>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    folder_hash  TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    payload      TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    PRIMARY KEY (folder_hash, content_hash)
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_created_at ON cache_entries(created_at);
";

/// SQLite-backed durable store
///
/// One row per key; lookups match both hash components exactly.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    /// Returns an error if the directory or database cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| CacheError::storage("open", e))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
            .map_err(|e| CacheError::storage("configure", e))?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Private in-memory database
    ///
    /// # Errors
    /// Returns an error if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::storage("open", e))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| CacheError::storage("migrate", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, `None` when in memory
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn key_columns(key: &CacheKey) -> (String, String) {
    (key.folder().to_string(), key.content().to_string())
}

impl CacheBackend for SqliteBackend {
    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>> {
        let (folder, content) = key_columns(key);
        self.conn
            .lock()
            .query_row(
                "SELECT payload, created_at FROM cache_entries
                 WHERE folder_hash = ?1 AND content_hash = ?2",
                params![folder, content],
                |row| {
                    Ok(StoredEntry {
                        payload: row.get(0)?,
                        created_at_ms: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|e| CacheError::storage("load", e))
    }

    fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()> {
        let (folder, content) = key_columns(key);
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO cache_entries
                 (folder_hash, content_hash, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![folder, content, entry.payload, entry.created_at_ms],
            )
            .map_err(|e| CacheError::storage("store", e))?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey, created_at_ms: i64) -> Result<bool> {
        let (folder, content) = key_columns(key);
        let removed = self
            .conn
            .lock()
            .execute(
                "DELETE FROM cache_entries
                 WHERE folder_hash = ?1 AND content_hash = ?2 AND created_at = ?3",
                params![folder, content, created_at_ms],
            )
            .map_err(|e| CacheError::storage("remove", e))?;
        Ok(removed > 0)
    }

    fn purge_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        self.conn
            .lock()
            .execute(
                "DELETE FROM cache_entries WHERE created_at < ?1",
                params![cutoff_ms],
            )
            .map_err(|e| CacheError::storage("purge", e))
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .map_err(|e| CacheError::storage("count", e))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Volatile backend for tests and `--no-persist` runs
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: Mutex<HashMap<(ContentHash, ContentHash), StoredEntry>>,
}

impl MemoryBackend {
    /// Empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryBackend {
    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>> {
        Ok(self.rows.lock().get(&(*key.folder(), *key.content())).cloned())
    }

    fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()> {
        self.rows
            .lock()
            .insert((*key.folder(), *key.content()), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey, created_at_ms: i64) -> Result<bool> {
        let mut rows = self.rows.lock();
        let id = (*key.folder(), *key.content());
        if rows.get(&id).is_some_and(|row| row.created_at_ms == created_at_ms) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    fn purge_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|_, entry| entry.created_at_ms >= cutoff_ms);
        Ok(before - rows.len())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.rows.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(n: u8) -> CacheKey {
        CacheKey::compute("/reports", [[n]])
    }

    fn entry(payload: &str, created_at_ms: i64) -> StoredEntry {
        StoredEntry {
            payload: payload.to_string(),
            created_at_ms,
        }
    }

    fn exercise(backend: &dyn CacheBackend) {
        assert_eq!(backend.load(&key(1)).unwrap(), None);

        backend.store(&key(1), &entry("first", 10)).unwrap();
        backend.store(&key(1), &entry("second", 20)).unwrap();
        backend.store(&key(2), &entry("other", 5)).unwrap();
        assert_eq!(backend.load(&key(1)).unwrap(), Some(entry("second", 20)));
        assert_eq!(backend.len().unwrap(), 2);

        assert_eq!(backend.purge_older_than(10).unwrap(), 1);
        assert_eq!(backend.load(&key(2)).unwrap(), None);

        assert!(!backend.remove(&key(1), 10).unwrap(), "rewritten row survives");
        assert!(backend.remove(&key(1), 20).unwrap());
        assert!(!backend.remove(&key(1), 20).unwrap());
        assert_eq!(backend.len().unwrap(), 0);
    }

    #[test]
    fn sqlite_backend_contract() {
        exercise(&SqliteBackend::in_memory().unwrap());
    }

    #[test]
    fn memory_backend_contract() {
        exercise(&MemoryBackend::new());
    }

    #[test]
    fn keys_match_on_both_components() {
        let backend = SqliteBackend::in_memory().unwrap();
        let a = CacheKey::compute("/a", [b"same"]);
        let b = CacheKey::compute("/b", [b"same"]);
        backend.store(&a, &entry("a", 1)).unwrap();
        assert_eq!(backend.load(&b).unwrap(), None);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cache.db");
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.path(), Some(path.as_path()));
        assert!(path.exists());
    }
}
