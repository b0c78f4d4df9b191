//! Two-tier response cache.
//!
//! Every logical cache (detail, video, listing pages) is a [`TieredCache`]:
//! an in-memory map checked first and an optional [`PersistentStore`] checked
//! on a memory miss. Successful fetches are written through to both tiers.
//! A stale entry is dropped when read. Each write also sweeps stale entries
//! out of the memory tier, so it stays bounded over a long session; the
//! persistent tier is only pruned on read.

pub mod file_store;
pub mod home;
pub mod memory;
pub mod sqlite_store;

pub use file_store::FileStore;
pub use home::HomeCache;
pub use memory::MemoryTier;
pub use sqlite_store::SqliteStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::config::CacheBackend;
use shared::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cached value plus the time it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Entry stamped with the current time
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    pub fn at(data: T, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// Fresh while `now - timestamp <= ttl`
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.timestamp).to_std() {
            Ok(age) => age <= ttl,
            // Timestamp in the future (clock skew)
            Err(_) => true,
        }
    }
}

/// Entry as kept by a persistent store
pub type StoredEntry = CacheEntry<serde_json::Value>;

/// Key/value storage that survives restarts.
///
/// Failures are reported, never swallowed here; the tiered cache decides to
/// treat them as misses.
pub trait PersistentStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>>;

    fn write(&self, key: &str, entry: &StoredEntry) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every entry
    fn clear(&self) -> Result<()>;

    fn stats(&self) -> Result<CacheStats>;
}

/// Open the persistent store selected by the configuration.
///
/// Returns `None` when the persistent tier is disabled.
pub fn open_store(config: &Config) -> Result<Option<Arc<dyn PersistentStore>>> {
    let cache = &config.api.cache;
    if !cache.enabled {
        info!("Persistent cache disabled, using memory only");
        return Ok(None);
    }

    let store: Arc<dyn PersistentStore> = match cache.backend {
        CacheBackend::File => Arc::new(FileStore::new(config.cache_dir())?),
        CacheBackend::Sqlite => Arc::new(SqliteStore::open(config.cache_db_path())?),
    };
    Ok(Some(store))
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
}

/// Memory tier in front of an optional persistent tier
pub struct TieredCache<T> {
    /// Cache kind, part of every persisted key
    kind: &'static str,
    ttl: Duration,
    key_prefix: String,
    memory: MemoryTier<T>,
    store: Option<Arc<dyn PersistentStore>>,
}

impl<T> TieredCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(
        kind: &'static str,
        ttl: Duration,
        key_prefix: impl Into<String>,
        store: Option<Arc<dyn PersistentStore>>,
    ) -> Self {
        Self {
            kind,
            ttl,
            key_prefix: key_prefix.into(),
            memory: MemoryTier::new(),
            store,
        }
    }

    /// Look up `id`, memory first, then the persistent tier.
    ///
    /// A persisted hit rehydrates the memory tier with its original timestamp.
    pub fn get(&self, id: &str) -> Option<T> {
        let now = Utc::now();

        if let Some(entry) = self.memory.get(id) {
            if entry.is_fresh(self.ttl, now) {
                debug!(kind = self.kind, key = id, "Memory cache hit");
                return Some(entry.data);
            }
            self.memory.remove(id);
        }

        let store = self.store.as_ref()?;
        let key = self.storage_key(id);

        let entry = match store.read(&key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(kind = self.kind, key = id, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(kind = self.kind, key = id, error = %e, "Storage read error, treating as miss");
                return None;
            }
        };

        if !entry.is_fresh(self.ttl, now) {
            debug!(kind = self.kind, key = id, "Persisted entry expired");
            self.discard(store.as_ref(), &key);
            return None;
        }

        match serde_json::from_value::<T>(entry.data) {
            Ok(data) => {
                debug!(kind = self.kind, key = id, "Persistent cache hit");
                self.memory
                    .insert(id, CacheEntry::at(data.clone(), entry.timestamp));
                Some(data)
            }
            Err(e) => {
                warn!(kind = self.kind, key = id, error = %e, "Corrupt persisted entry, discarding");
                self.discard(store.as_ref(), &key);
                None
            }
        }
    }

    /// Write `value` through to both tiers
    pub fn put(&self, id: &str, value: T) {
        self.put_entry(id, CacheEntry::new(value));
    }

    fn put_entry(&self, id: &str, entry: CacheEntry<T>) {
        let swept = self.memory.retain_fresh(self.ttl, Utc::now());
        if swept > 0 {
            debug!(kind = self.kind, swept, "Swept stale memory entries");
        }

        if let Some(store) = &self.store {
            let key = self.storage_key(id);
            match serde_json::to_value(&entry.data) {
                Ok(data) => {
                    if let Err(e) = store.write(&key, &CacheEntry::at(data, entry.timestamp)) {
                        warn!(kind = self.kind, key = id, error = %e, "Storage write error");
                    }
                }
                Err(e) => {
                    warn!(kind = self.kind, key = id, error = %e, "Failed to serialize cache entry");
                }
            }
        }

        self.memory.insert(id, entry);
        debug!(kind = self.kind, key = id, "Cache stored");
    }

    /// Drop every in-memory entry
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    fn discard(&self, store: &dyn PersistentStore, key: &str) {
        if let Err(e) = store.remove(key) {
            warn!(kind = self.kind, key = key, error = %e, "Failed to remove persisted entry");
        }
    }

    /// Persisted key: prefix, kind, identifier
    fn storage_key(&self, id: &str) -> String {
        format!("{}{}_{}", self.key_prefix, self.kind, id)
    }
}
