//! Single-slot snapshot of the home page listings.
//!
//! Holds the first page of the latest and recommended listings under one
//! shared timestamp. Either listing can populate the slot and either can be
//! served from it while the snapshot is fresh. Writing one half refreshes the
//! timestamp of the whole snapshot.

use chrono::{DateTime, Utc};
use shared::Anime;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct HomeSnapshot {
    latest: Option<Vec<Anime>>,
    recommended: Option<Vec<Anime>>,
    timestamp: DateTime<Utc>,
}

/// Home snapshot with its own, shorter TTL
#[derive(Debug)]
pub struct HomeCache {
    ttl: Duration,
    slot: Mutex<Option<HomeSnapshot>>,
}

impl HomeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn latest(&self) -> Option<Vec<Anime>> {
        self.read(|snapshot| snapshot.latest.clone())
    }

    pub fn recommended(&self) -> Option<Vec<Anime>> {
        self.read(|snapshot| snapshot.recommended.clone())
    }

    pub fn store_latest(&self, items: Vec<Anime>) {
        self.write(|snapshot| snapshot.latest = Some(items));
    }

    pub fn store_recommended(&self, items: Vec<Anime>) {
        self.write(|snapshot| snapshot.recommended = Some(items));
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn read<F>(&self, f: F) -> Option<Vec<Anime>>
    where
        F: FnOnce(&HomeSnapshot) -> Option<Vec<Anime>>,
    {
        let slot = self.lock();
        let snapshot = slot.as_ref()?;
        let fresh = Utc::now()
            .signed_duration_since(snapshot.timestamp)
            .to_std()
            .map_or(true, |age| age <= self.ttl);
        if fresh {
            f(snapshot)
        } else {
            None
        }
    }

    fn write<F>(&self, f: F)
    where
        F: FnOnce(&mut HomeSnapshot),
    {
        let mut slot = self.lock();
        let snapshot = slot.get_or_insert_with(|| HomeSnapshot {
            latest: None,
            recommended: None,
            timestamp: Utc::now(),
        });
        f(snapshot);
        snapshot.timestamp = Utc::now();
    }

    fn lock(&self) -> MutexGuard<'_, Option<HomeSnapshot>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anime(url: &str) -> Anime {
        Anime {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_halves_are_independent() {
        let home = HomeCache::new(Duration::from_secs(300));
        assert!(home.latest().is_none());

        home.store_recommended(vec![anime("frieren")]);
        assert!(home.latest().is_none());
        assert_eq!(home.recommended().unwrap()[0].url, "frieren");

        home.store_latest(vec![anime("one-piece"), anime("bleach")]);
        assert_eq!(home.latest().unwrap().len(), 2);
        assert_eq!(home.recommended().unwrap().len(), 1);
    }

    #[test]
    fn test_stale_snapshot_is_miss() {
        let home = HomeCache::new(Duration::from_secs(300));
        home.store_latest(vec![anime("one-piece")]);

        if let Some(snapshot) = home.lock().as_mut() {
            snapshot.timestamp = Utc::now() - chrono::Duration::minutes(6);
        }
        assert!(home.latest().is_none());

        // Writing the other half refreshes the whole snapshot
        home.store_recommended(vec![anime("frieren")]);
        assert!(home.latest().is_some());
    }

    #[test]
    fn test_clear() {
        let home = HomeCache::new(Duration::from_secs(300));
        home.store_latest(vec![anime("one-piece")]);
        home.clear();
        assert!(home.latest().is_none());
    }
}
