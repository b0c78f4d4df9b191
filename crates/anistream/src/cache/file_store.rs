//! File-backed persistent store.
//!
//! Stores each entry as one JSON file (`{"data": ..., "timestamp": ...}`)
//! inside the cache directory.

use super::{CacheStats, PersistentStore, StoredEntry};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory of JSON cache files
pub struct FileStore {
    /// Root cache directory
    cache_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store, creating the directory if needed
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        info!(cache_dir = %cache_dir.display(), "File cache initialized");

        Ok(Self { cache_dir })
    }

    /// Get the cache file path for a given key.
    ///
    /// Characters that are not safe in a file name, plus `%` itself, are
    /// percent-encoded, so distinct keys always map to distinct files.
    fn cache_path(&self, key: &str) -> PathBuf {
        let mut safe_key = String::with_capacity(key.len());
        for c in key.chars() {
            match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' => {
                    safe_key.push_str(&format!("%{:02X}", c as u32));
                }
                c if c.is_whitespace() || c.is_control() => {
                    let mut buf = [0u8; 4];
                    for byte in c.encode_utf8(&mut buf).bytes() {
                        safe_key.push_str(&format!("%{:02X}", byte));
                    }
                }
                c => safe_key.push(c),
            }
        }

        self.cache_dir.join(format!("{}.json", safe_key))
    }
}

impl PersistentStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

        let entry: StoredEntry = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;

        Ok(Some(entry))
    }

    fn write(&self, key: &str, entry: &StoredEntry) -> Result<()> {
        let path = self.cache_path(key);

        let content = serde_json::to_string(entry).context("Failed to serialize cache data")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

        debug!(key = key, path = %path.display(), "Cache file stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.cache_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", path.display()))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            std::fs::remove_dir_all(&self.cache_dir)
                .with_context(|| format!("Failed to remove cache directory: {}", self.cache_dir.display()))?;
        }
        std::fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to recreate cache directory: {}", self.cache_dir.display()))?;
        info!("File cache cleared");

        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        if !self.cache_dir.exists() {
            return Ok(CacheStats::default());
        }

        let mut stats = CacheStats::default();
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                stats.total_entries += 1;
                stats.total_size_bytes += entry.metadata()?.len();
            }
        }

        Ok(stats)
    }
}
