//! Anime API client implementation.
//!
//! This module provides a throttled, retry-enabled, cached client for the
//! upstream anime streaming API.

pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::{fallback_sample, AnimeClient};
pub use error::{ApiError, ApiResult};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use types::*;
