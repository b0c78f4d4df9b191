//! In-memory cache tier.

use super::CacheEntry;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Process-local map from cache key to entry
#[derive(Debug)]
pub struct MemoryTier<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> MemoryTier<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.lock().get(key).cloned()
    }

    /// Insert or replace; the last write wins
    pub fn insert(&self, key: &str, entry: CacheEntry<T>) {
        self.lock().insert(key.to_string(), entry);
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop every entry older than `ttl`, returning how many went
    pub fn retain_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(ttl, now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> Default for MemoryTier<T> {
    fn default() -> Self {
        Self::new()
    }
}
