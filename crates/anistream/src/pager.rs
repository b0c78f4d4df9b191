//! Page cursor over a paginated listing.
//!
//! After every page change the pager asks the prefetcher to warm the page the
//! user is most likely to open next, so forward and backward navigation is
//! usually served from cache.

use crate::api::AnimeClient;
use crate::prefetch::Prefetcher;
use async_trait::async_trait;
use shared::{Anime, SearchResult};
use tokio::task::JoinHandle;
use tracing::debug;

/// A listing that can be fetched one page at a time
#[async_trait]
pub trait PagedListing: Clone + Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch one page; an empty page means there is nothing there
    async fn fetch(&self, client: &AnimeClient, page: u32) -> Vec<Self::Item>;
}

/// Search results for one query
#[derive(Debug, Clone)]
pub struct SearchListing {
    pub query: String,
}

impl SearchListing {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

#[async_trait]
impl PagedListing for SearchListing {
    type Item = SearchResult;

    fn name(&self) -> &str {
        "search"
    }

    async fn fetch(&self, client: &AnimeClient, page: u32) -> Vec<SearchResult> {
        client.search(&self.query, page).await
    }
}

/// The recommended listing
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendedListing;

#[async_trait]
impl PagedListing for RecommendedListing {
    type Item = Anime;

    fn name(&self) -> &str {
        "recommended"
    }

    async fn fetch(&self, client: &AnimeClient, page: u32) -> Vec<Anime> {
        client.get_recommended(page).await
    }
}

/// The latest listing
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestListing;

#[async_trait]
impl PagedListing for LatestListing {
    type Item = Anime;

    fn name(&self) -> &str {
        "latest"
    }

    async fn fetch(&self, client: &AnimeClient, page: u32) -> Vec<Anime> {
        client.get_latest(page).await
    }
}

/// Cursor over one listing
pub struct Pager<L: PagedListing> {
    client: AnimeClient,
    prefetcher: Prefetcher,
    listing: L,
    page: u32,
    items: Vec<L::Item>,
    pending: Option<JoinHandle<()>>,
}

impl<L: PagedListing> Pager<L> {
    pub fn new(client: AnimeClient, prefetcher: Prefetcher, listing: L) -> Self {
        Self {
            client,
            prefetcher,
            listing,
            page: 0,
            items: Vec::new(),
            pending: None,
        }
    }

    /// Current page number; 0 before the first load
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Items of the current page
    pub fn current(&self) -> &[L::Item] {
        &self.items
    }

    /// Load page 1 and warm page 2
    pub async fn load_first(&mut self) -> &[L::Item] {
        self.page = 1;
        self.items = self.listing.fetch(&self.client, 1).await;
        if !self.items.is_empty() {
            self.schedule(2);
        }
        &self.items
    }

    /// Move forward one page.
    ///
    /// Returns false and keeps the cursor where it is when the next page is
    /// empty.
    pub async fn next_page(&mut self) -> bool {
        let target = self.page + 1;
        let items = self.listing.fetch(&self.client, target).await;
        if items.is_empty() {
            debug!(listing = self.listing.name(), page = target, "No further page");
            return false;
        }

        self.page = target;
        self.items = items;
        self.schedule(target + 1);
        true
    }

    /// Move back one page, warming the page before it
    pub async fn previous_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }

        let target = self.page - 1;
        let items = self.listing.fetch(&self.client, target).await;
        if items.is_empty() {
            return false;
        }

        self.page = target;
        self.items = items;
        if target > 1 {
            self.schedule(target - 1);
        }
        true
    }

    /// Take the handle of the most recently scheduled prefetch
    pub fn take_pending(&mut self) -> Option<JoinHandle<()>> {
        self.pending.take()
    }

    fn schedule(&mut self, page: u32) {
        // Earlier prefetches keep running; the last write to the cache wins
        self.pending = self.prefetcher.prefetch_page(self.listing.clone(), page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{anime_list, search_body, test_config, ScriptedTransport};
    use shared::config::ApiConfig;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn unthrottled() -> ApiConfig {
        let mut config = test_config();
        config.rate_limit.min_interval_ms = 0;
        config
    }

    fn pager<L: PagedListing>(transport: &Arc<ScriptedTransport>, listing: L) -> Pager<L> {
        let config = unthrottled();
        let client = AnimeClient::with_transport(&config, transport.clone(), None);
        let prefetcher = Prefetcher::new(client.clone(), &config.prefetch);
        Pager::new(client, prefetcher, listing)
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_page_served_from_prefetch() {
        let transport = ScriptedTransport::new();
        transport.ok("search", search_body("naruto", 5, 1, true));
        transport.ok("search", search_body("naruto", 5, 2, true));
        let mut pager = pager(&transport, SearchListing::new("naruto"));

        let start = Instant::now();
        assert_eq!(pager.load_first().await.len(), 5);

        pager.take_pending().unwrap().await.unwrap();
        assert!(start.elapsed() <= Duration::from_millis(500));
        assert_eq!(transport.count("search"), 2);
        assert_eq!(transport.calls()[1].param("page"), Some("2"));

        assert!(pager.next_page().await);
        assert_eq!(pager.page(), 2);
        assert_eq!(pager.current()[0].url, "naruto-2-0");
        // Page 2 came from the cache; page 3 is only scheduled
        assert_eq!(transport.count("search"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_page_without_prefetch_fetches() {
        let transport = ScriptedTransport::new();
        transport.ok("search", search_body("bleach", 3, 1, true));
        transport.ok("search", search_body("bleach", 3, 2, false));
        let mut pager = pager(&transport, SearchListing::new("bleach"));

        pager.load_first().await;
        // Navigate before the prefetch delay elapses
        pager.take_pending().unwrap().abort();

        assert!(pager.next_page().await);
        assert_eq!(pager.current()[0].url, "bleach-2-0");
        assert_eq!(transport.count("search"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_next_page_keeps_cursor() {
        let transport = ScriptedTransport::new();
        transport.ok("recommended", anime_list(&["frieren"]));
        transport.ok("recommended", "[]");
        let mut pager = pager(&transport, RecommendedListing);

        pager.load_first().await;
        pager.take_pending().unwrap().await.unwrap();

        assert!(!pager.next_page().await);
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.current()[0].url, "frieren");
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_page_warms_the_page_before() {
        let transport = ScriptedTransport::new();
        transport.ok("recommended", anime_list(&["p1"]));
        transport.ok("recommended", anime_list(&["p2"]));
        transport.ok("recommended", anime_list(&["p3"]));
        let mut pager = pager(&transport, RecommendedListing);

        pager.load_first().await;
        pager.take_pending().unwrap().await.unwrap();
        assert!(pager.next_page().await);
        pager.take_pending().unwrap().await.unwrap();
        assert!(pager.next_page().await);
        assert_eq!(pager.page(), 3);
        pager.take_pending().unwrap().abort();

        // Page 2 is cached; moving there schedules page 1, which is the home snapshot
        assert!(pager.previous_page().await);
        assert_eq!(pager.page(), 2);
        assert_eq!(pager.current()[0].url, "p2");
        pager.take_pending().unwrap().await.unwrap();

        assert!(pager.previous_page().await);
        assert_eq!(pager.page(), 1);
        assert!(pager.take_pending().is_none());
        assert!(!pager.previous_page().await);
        assert_eq!(transport.count("recommended"), 3);
    }
}
