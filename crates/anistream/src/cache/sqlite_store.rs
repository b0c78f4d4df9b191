//! SQLite-backed persistent store.

use super::{CacheEntry, CacheStats, PersistentStore, StoredEntry};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use shared::Database;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Cache entries kept in the `cache_entries` table
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Open or create the cache database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path).context("Failed to open cache database")?;
        Ok(Self::new(db))
    }

    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PersistentStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
        let db = self.lock();
        let row: Option<(String, DateTime<Utc>)> = db
            .conn()
            .query_row(
                "SELECT data, timestamp FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to query cache entry {}", key))?;

        match row {
            Some((data, timestamp)) => {
                let data = serde_json::from_str(&data)
                    .with_context(|| format!("Failed to parse cache entry {}", key))?;
                Ok(Some(CacheEntry::at(data, timestamp)))
            }
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, entry: &StoredEntry) -> Result<()> {
        let data = serde_json::to_string(&entry.data).context("Failed to serialize cache data")?;

        self.lock()
            .conn()
            .execute(
                "INSERT INTO cache_entries (key, data, timestamp) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET data = excluded.data, timestamp = excluded.timestamp",
                params![key, data, entry.timestamp],
            )
            .with_context(|| format!("Failed to store cache entry {}", key))?;

        debug!(key = key, "Cache row stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()
            .conn()
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to remove cache entry {}", key))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let removed = self
            .lock()
            .conn()
            .execute("DELETE FROM cache_entries", [])
            .context("Failed to clear cache entries")?;
        info!(removed = removed, "SQLite cache cleared");
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        let (count, bytes): (i64, i64) = self
            .lock()
            .conn()
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(LENGTH(data)), 0) FROM cache_entries",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to read cache statistics")?;

        Ok(CacheStats {
            total_entries: count as usize,
            total_size_bytes: bytes as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_overwrite() -> Result<()> {
        let store = SqliteStore::new(Database::open_in_memory()?);

        let first = CacheEntry::new(json!({"episode_id": 1}));
        store.write("anistream_video_ep-1_720p", &first)?;
        assert_eq!(store.read("anistream_video_ep-1_720p")?, Some(first));

        let second = CacheEntry::new(json!({"episode_id": 2}));
        store.write("anistream_video_ep-1_720p", &second)?;
        assert_eq!(store.read("anistream_video_ep-1_720p")?, Some(second));
        assert_eq!(store.stats()?.total_entries, 1);

        Ok(())
    }

    #[test]
    fn test_remove_and_clear() -> Result<()> {
        let store = SqliteStore::new(Database::open_in_memory()?);

        store.write("a", &CacheEntry::new(json!("a")))?;
        store.write("b", &CacheEntry::new(json!("b")))?;

        store.remove("a")?;
        assert!(store.read("a")?.is_none());
        assert!(store.read("b")?.is_some());

        store.clear()?;
        let stats = store.stats()?;
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_size_bytes, 0);

        Ok(())
    }

    #[test]
    fn test_survives_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("cache.db");

        let entry = CacheEntry::new(json!([1, 2, 3]));
        SqliteStore::open(&db_path)?.write("k", &entry)?;

        let reopened = SqliteStore::open(&db_path)?;
        assert_eq!(reopened.read("k")?, Some(entry));

        Ok(())
    }
}
