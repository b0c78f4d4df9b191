//! Status enrichment for listing items.
//!
//! Listing endpoints often leave the status field empty. The enricher walks
//! the first few items and back-fills the status from each item's detail
//! page, one lookup at a time with a pause before each.

use crate::api::AnimeClient;
use shared::config::EnrichConfig;
use shared::Anime;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Statistics for one enrichment pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichStats {
    pub considered: usize,
    pub filled: usize,
    pub errors: usize,
}

/// Back-fills missing status fields from detail lookups
#[derive(Clone)]
pub struct StatusEnricher {
    client: AnimeClient,
    limit: usize,
    delay: Duration,
}

impl StatusEnricher {
    pub fn new(client: AnimeClient, config: &EnrichConfig) -> Self {
        Self {
            client,
            limit: config.limit,
            delay: Duration::from_millis(config.delay_ms),
        }
    }

    /// Default number of leading items considered
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Enrich the first `limit` items of `list`.
    ///
    /// Items that already carry a status are left untouched and cost no
    /// request. A failed lookup leaves its item as it was.
    pub async fn enrich(&self, mut list: Vec<Anime>, limit: usize) -> Vec<Anime> {
        let stats = self.enrich_in_place(&mut list, limit).await;
        if stats.considered > 0 {
            info!(
                considered = stats.considered,
                filled = stats.filled,
                errors = stats.errors,
                "Status enrichment complete"
            );
        }
        list
    }

    async fn enrich_in_place(&self, list: &mut [Anime], limit: usize) -> EnrichStats {
        let mut stats = EnrichStats::default();

        for item in list.iter_mut().take(limit) {
            if !item.needs_status() {
                continue;
            }
            stats.considered += 1;

            sleep(self.delay).await;

            match self.client.get_detail(&item.url).await {
                Ok(Some(detail)) => {
                    if item.fill_status(&detail.status) {
                        debug!(url = %item.url, status = %detail.status, "Status filled");
                        stats.filled += 1;
                    }
                }
                Ok(None) => {
                    debug!(url = %item.url, "No detail available for status");
                }
                Err(e) => {
                    warn!(url = %item.url, error = %e, "Status lookup failed, skipping");
                    stats.errors += 1;
                }
            }
        }

        stats
    }
}
