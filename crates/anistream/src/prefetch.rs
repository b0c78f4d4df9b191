//! Speculative background fetches.
//!
//! A prefetch is a detached task: it waits a short delay, performs the normal
//! cached operation and drops the result, leaving it in the cache for the
//! foreground request that usually follows. Prefetches share the client's
//! throttle gate, so they never bypass the request spacing.

use crate::api::AnimeClient;
use crate::pager::{PagedListing, RecommendedListing, SearchListing};
use shared::config::PrefetchConfig;
use shared::Resolution;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Schedules background cache warm-ups
#[derive(Clone)]
pub struct Prefetcher {
    client: AnimeClient,
    enabled: bool,
    page_delay: Duration,
    video_delay: Duration,
}

impl Prefetcher {
    pub fn new(client: AnimeClient, config: &PrefetchConfig) -> Self {
        Self {
            client,
            enabled: config.enabled,
            page_delay: Duration::from_millis(config.page_delay_ms),
            video_delay: Duration::from_millis(config.video_delay_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Warm `page` of `listing` after the page delay.
    ///
    /// Returns `None` when prefetching is disabled.
    pub fn prefetch_page<L: PagedListing>(&self, listing: L, page: u32) -> Option<JoinHandle<()>> {
        if !self.enabled || page == 0 {
            return None;
        }

        let client = self.client.clone();
        let delay = self.page_delay;
        Some(tokio::spawn(async move {
            sleep(delay).await;
            let items = listing.fetch(&client, page).await;
            debug!(
                listing = listing.name(),
                page = page,
                count = items.len(),
                "Prefetched page"
            );
        }))
    }

    pub fn prefetch_search_page(&self, query: &str, page: u32) -> Option<JoinHandle<()>> {
        self.prefetch_page(SearchListing::new(query), page)
    }

    pub fn prefetch_recommended_page(&self, page: u32) -> Option<JoinHandle<()>> {
        self.prefetch_page(RecommendedListing, page)
    }

    /// Warm the resolution a viewer is most likely to switch to
    pub fn prefetch_alternate_resolution(
        &self,
        chapter_url_id: &str,
        current: Resolution,
    ) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let client = self.client.clone();
        let delay = self.video_delay;
        let chapter = chapter_url_id.to_string();
        let alternate = current.alternate();
        Some(tokio::spawn(async move {
            sleep(delay).await;
            match client.get_video(&chapter, alternate).await {
                Ok(Some(_)) => debug!(chapter = %chapter, reso = %alternate, "Prefetched video"),
                Ok(None) => debug!(chapter = %chapter, reso = %alternate, "No video to prefetch"),
                Err(e) => warn!(chapter = %chapter, reso = %alternate, error = %e, "Video prefetch failed"),
            }
        }))
    }
}
