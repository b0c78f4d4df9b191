//! Anime API client with caching, throttling and retry logic.
//!
//! Every operation follows the same path: consult its cache, and on a miss
//! pass the throttle gate, perform the request under the retry policy,
//! normalize the response and write it through to the cache.
//!
//! Listing operations never fail: on an unrecoverable error they degrade to
//! an empty list (or, for the latest listing, a fixed sample) so a view always
//! has something to render. Detail and video lookups propagate the error.

use super::error::{ApiError, ApiResult};
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, Transport};
use super::types::{normalize_detail, normalize_list, normalize_search, normalize_video};
use crate::cache::{self, CacheStats, HomeCache, PersistentStore, TieredCache};
use once_cell::sync::Lazy;
use shared::config::ApiConfig;
use shared::{Anime, AnimeDetail, Config, Episode, Movie, Resolution, SearchPage, SearchResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shown by the latest listing when the upstream API cannot be reached
static FALLBACK_SAMPLE: Lazy<Vec<Anime>> = Lazy::new(|| {
    vec![
        Anime {
            id: 1,
            url: "one-piece-z-01".to_string(),
            title: "One Piece (Movie)".to_string(),
            cover: "https://images.unsplash.com/photo-1578926078328-123456789?w=300&h=400&fit=crop"
                .to_string(),
            last_chapter: "1135".to_string(),
            last_update: "2024-01-17".to_string(),
            status: Some("Ongoing".to_string()),
        },
        Anime {
            id: 2,
            url: "naruto-shippuden".to_string(),
            title: "Naruto Shippuden".to_string(),
            cover: "https://images.unsplash.com/photo-1492684223066-81342ee5ff30?w=300&h=400&fit=crop"
                .to_string(),
            last_chapter: "500".to_string(),
            last_update: "2024-01-16".to_string(),
            status: Some("Completed".to_string()),
        },
        Anime {
            id: 3,
            url: "demon-slayer".to_string(),
            title: "Demon Slayer".to_string(),
            cover: "https://images.unsplash.com/photo-1561070791-2526d30994b5?w=300&h=400&fit=crop"
                .to_string(),
            last_chapter: "55".to_string(),
            last_update: "2024-01-15".to_string(),
            status: Some("Ongoing".to_string()),
        },
    ]
});

/// The fixed sample served when the latest listing is unavailable
pub fn fallback_sample() -> Vec<Anime> {
    FALLBACK_SAMPLE.clone()
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
    /// Cool-downs installed when a listing degrades on a 429 without `Retry-After`
    latest_cooldown: Duration,
    listing_cooldown: Duration,
    fallback_sample: bool,
    store: Option<Arc<dyn PersistentStore>>,
    home: HomeCache,
    detail: TieredCache<AnimeDetail>,
    video: TieredCache<Episode>,
    latest: TieredCache<Vec<Anime>>,
    recommended: TieredCache<Vec<Anime>>,
    movies: TieredCache<Vec<Movie>>,
    search: TieredCache<SearchPage>,
}

/// Anime API client
///
/// Cheap to clone; clones share the throttle state and every cache.
#[derive(Clone)]
pub struct AnimeClient {
    inner: Arc<ClientInner>,
}

impl AnimeClient {
    /// Create a client talking HTTP to `config.base_url`
    pub fn new(config: &ApiConfig, store: Option<Arc<dyn PersistentStore>>) -> ApiResult<Self> {
        let transport = HttpTransport::new(Duration::from_millis(config.timeout_ms))?;
        Ok(Self::with_transport(config, Arc::new(transport), store))
    }

    /// Create a client from the full configuration, opening the configured store
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = cache::open_store(config)?;
        let client = Self::new(&config.api, store)?;
        info!(base_url = %config.api.base_url, "API client initialized");
        Ok(client)
    }

    /// Create a client on top of an arbitrary transport
    pub fn with_transport(
        config: &ApiConfig,
        transport: Arc<dyn Transport>,
        store: Option<Arc<dyn PersistentStore>>,
    ) -> Self {
        let cache = &config.cache;
        let prefix = cache.key_prefix.as_str();

        let inner = ClientInner {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(config.rate_limit.min_interval()),
            retry: RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay()),
            latest_cooldown: config.rate_limit.latest_cooldown(),
            listing_cooldown: config.rate_limit.listing_cooldown(),
            fallback_sample: config.fallback_sample,
            home: HomeCache::new(cache.home_ttl()),
            detail: TieredCache::new("detail", cache.detail_ttl(), prefix, store.clone()),
            video: TieredCache::new("video", cache.video_ttl(), prefix, store.clone()),
            latest: TieredCache::new("latest", cache.listing_ttl(), prefix, store.clone()),
            recommended: TieredCache::new("recommended", cache.listing_ttl(), prefix, store.clone()),
            movies: TieredCache::new("movie", cache.listing_ttl(), prefix, store.clone()),
            search: TieredCache::new("search", cache.listing_ttl(), prefix, store.clone()),
            store,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Throttle gate shared by every request of this client
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Fetch a page of the latest listing
    pub async fn get_latest(&self, page: u32) -> Vec<Anime> {
        let page = page.max(1);
        let key = page.to_string();

        let cached = if page == 1 {
            self.inner.home.latest()
        } else {
            self.inner.latest.get(&key)
        };
        if let Some(items) = cached {
            debug!(page = page, "Loading latest from cache");
            return items;
        }

        let result = self
            .fetch_with_retry("latest", vec![("page", key.clone())])
            .await
            .and_then(|body| normalize_list::<Anime>(&body));

        match result {
            Ok(items) => {
                if !items.is_empty() {
                    if page == 1 {
                        self.inner.home.store_latest(items.clone());
                    } else {
                        self.inner.latest.put(&key, items.clone());
                    }
                }
                items
            }
            Err(e) => {
                self.degrade("latest", &e, self.inner.latest_cooldown);
                if self.inner.fallback_sample {
                    fallback_sample()
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Fetch a page of the recommended listing
    pub async fn get_recommended(&self, page: u32) -> Vec<Anime> {
        let page = page.max(1);
        let key = page.to_string();

        let cached = if page == 1 {
            self.inner.home.recommended()
        } else {
            self.inner.recommended.get(&key)
        };
        if let Some(items) = cached {
            debug!(page = page, "Loading recommended from cache");
            return items;
        }

        let result = self
            .fetch_with_retry("recommended", vec![("page", key.clone())])
            .await
            .and_then(|body| normalize_list::<Anime>(&body));

        match result {
            Ok(items) => {
                if !items.is_empty() {
                    if page == 1 {
                        self.inner.home.store_recommended(items.clone());
                    } else {
                        self.inner.recommended.put(&key, items.clone());
                    }
                }
                items
            }
            Err(e) => {
                self.degrade("recommended", &e, self.inner.listing_cooldown);
                Vec::new()
            }
        }
    }

    /// Fetch the movie listing
    pub async fn get_movies(&self) -> Vec<Movie> {
        const KEY: &str = "all";

        if let Some(items) = self.inner.movies.get(KEY) {
            return items;
        }

        let result = self
            .fetch_with_retry("movie", Vec::new())
            .await
            .and_then(|body| normalize_list::<Movie>(&body));

        match result {
            Ok(items) => {
                if !items.is_empty() {
                    self.inner.movies.put(KEY, items.clone());
                }
                items
            }
            Err(e) => {
                self.degrade("movie", &e, self.inner.listing_cooldown);
                Vec::new()
            }
        }
    }

    /// Search by title
    pub async fn search(&self, query: &str, page: u32) -> Vec<SearchResult> {
        self.search_page(query, page).await.results
    }

    /// Search by title, keeping the pagination metadata
    pub async fn search_page(&self, query: &str, page: u32) -> SearchPage {
        let query = query.trim();
        let page = page.max(1);
        if query.is_empty() {
            return SearchPage::default();
        }

        let key = format!("{}_{}", query, page);
        if let Some(cached) = self.inner.search.get(&key) {
            debug!(query = query, page = page, "Loading search from cache");
            return cached;
        }

        let result = self
            .fetch_with_retry(
                "search",
                vec![("query", query.to_string()), ("page", page.to_string())],
            )
            .await
            .and_then(|body| normalize_search(&body));

        match result {
            Ok(found) => {
                if !found.results.is_empty() {
                    self.inner.search.put(&key, found.clone());
                }
                found
            }
            Err(e) => {
                self.degrade("search", &e, self.inner.listing_cooldown);
                SearchPage::default()
            }
        }
    }

    /// Fetch the detail page of an anime.
    ///
    /// `Ok(None)` means the upstream answered without a usable record.
    pub async fn get_detail(&self, url_id: &str) -> ApiResult<Option<AnimeDetail>> {
        if let Some(detail) = self.inner.detail.get(url_id) {
            return Ok(Some(detail));
        }

        let body = self
            .fetch_with_retry("detail", vec![("urlId", url_id.to_string())])
            .await
            .map_err(|e| {
                error!(url_id = url_id, error = %e, "Failed to fetch anime detail");
                e
            })?;

        match normalize_detail(&body) {
            Ok(Some(detail)) => {
                debug!(url_id = url_id, chapters = detail.chapters.len(), "Detail fetched");
                self.inner.detail.put(url_id, detail.clone());
                Ok(Some(detail))
            }
            Ok(None) => {
                warn!(url_id = url_id, "Detail response carried no record");
                Ok(None)
            }
            Err(e) => {
                warn!(url_id = url_id, error = %e, "Ignoring malformed detail response");
                Ok(None)
            }
        }
    }

    /// Fetch the streams of one chapter at one resolution
    pub async fn get_video(
        &self,
        chapter_url_id: &str,
        resolution: Resolution,
    ) -> ApiResult<Option<Episode>> {
        let key = format!("{}_{}", chapter_url_id, resolution);
        if let Some(episode) = self.inner.video.get(&key) {
            return Ok(Some(episode));
        }

        let body = self
            .fetch_with_retry(
                "getvideo",
                vec![
                    ("chapterUrlId", chapter_url_id.to_string()),
                    ("reso", resolution.to_string()),
                ],
            )
            .await
            .map_err(|e| {
                error!(chapter = chapter_url_id, reso = %resolution, error = %e, "Failed to fetch video");
                e
            })?;

        match normalize_video(&body) {
            Ok(Some(episode)) => {
                debug!(
                    chapter = chapter_url_id,
                    reso = %resolution,
                    streams = episode.streams.len(),
                    "Episode fetched"
                );
                self.inner.video.put(&key, episode.clone());
                Ok(Some(episode))
            }
            Ok(None) => {
                warn!(chapter = chapter_url_id, reso = %resolution, "Video response carried no episode");
                Ok(None)
            }
            Err(e) => {
                warn!(chapter = chapter_url_id, error = %e, "Ignoring malformed video response");
                Ok(None)
            }
        }
    }

    /// Statistics of the persistent tier, if one is configured
    pub fn cache_stats(&self) -> anyhow::Result<Option<CacheStats>> {
        self.inner.store.as_ref().map(|store| store.stats()).transpose()
    }

    /// Drop every cached value in every tier
    pub fn clear_caches(&self) -> anyhow::Result<()> {
        let inner = &self.inner;
        inner.home.clear();
        inner.detail.clear_memory();
        inner.video.clear_memory();
        inner.latest.clear_memory();
        inner.recommended.clear_memory();
        inner.movies.clear_memory();
        inner.search.clear_memory();

        if let Some(store) = &inner.store {
            store.clear()?;
        }
        info!("All caches cleared");
        Ok(())
    }

    /// One request through the throttle gate
    async fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> ApiResult<String> {
        let url = format!("{}/{}", self.inner.base_url, endpoint);

        self.inner.limiter.acquire().await;
        debug!(url = %url, "Making API request");

        let response = self.inner.transport.get(&url, query).await.map_err(|e| {
            warn!(url = %url, error = %e, "Request error");
            e
        })?;

        if response.status == 429 {
            // Visible to every operation, not just this one
            if let Some(retry_after) = response.retry_after {
                self.inner.limiter.report_rate_limited(retry_after);
            }
            return Err(ApiError::RateLimited {
                retry_after: response.retry_after,
            });
        }

        if !response.is_success() {
            warn!(url = %url, status = response.status, "Request failed");
            return Err(ApiError::Status {
                status: response.status,
                url,
            });
        }

        Ok(response.body)
    }

    async fn fetch_with_retry(
        &self,
        endpoint: &str,
        query: Vec<(&'static str, String)>,
    ) -> ApiResult<String> {
        self.inner
            .retry
            .run(&self.inner.limiter, || self.fetch(endpoint, &query))
            .await
    }

    /// Log an unrecoverable listing failure before serving fallback content
    fn degrade(&self, endpoint: &str, error: &ApiError, default_cooldown: Duration) {
        if error.is_rate_limited() {
            let cooldown = error.retry_after().unwrap_or(default_cooldown);
            self.inner.limiter.report_rate_limited(cooldown);
            warn!(
                endpoint = endpoint,
                cooldown_secs = cooldown.as_secs(),
                "API is rate limited, serving fallback content"
            );
        } else {
            error!(
                endpoint = endpoint,
                error = %error,
                "Request failed, serving fallback content"
            );
        }
    }
}
