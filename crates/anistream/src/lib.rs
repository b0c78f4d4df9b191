//! anistream library: a cached, throttled client for an anime streaming API.
//!
//! This library provides the upstream API client together with the pieces a
//! browsing front-end builds on: response caching, page prefetching and
//! status enrichment of listing items.

pub mod api;
pub mod cache;
pub mod enrich;
pub mod pager;
pub mod prefetch;

#[cfg(test)]
mod test_support;

pub use api::{AnimeClient, ApiError, ApiResult, RateLimiter, RetryPolicy};
pub use cache::{CacheStats, FileStore, PersistentStore, SqliteStore};
pub use enrich::StatusEnricher;
pub use pager::{LatestListing, PagedListing, Pager, RecommendedListing, SearchListing};
pub use prefetch::Prefetcher;
