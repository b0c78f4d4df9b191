//! HTTP transport used by the API client.
//!
//! The client only needs "GET this URL with these query parameters and hand
//! me status, `Retry-After` and body". Keeping that behind a trait lets the
//! client run against a scripted transport in tests.

use super::error::{ApiError, ApiResult};
use super::rate_limiter::MAX_COOLDOWN;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Raw upstream response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header (delta-seconds form)
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one GET request.
    ///
    /// Returns `Err` only for connection-level failures; any HTTP status,
    /// including 429, comes back as `Ok`.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> ApiResult<HttpResponse>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("anistream/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> ApiResult<HttpResponse> {
        debug!(url = %url, ?query, "Sending request");

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Parse a `Retry-After` value given in whole seconds, capped at [`MAX_COOLDOWN`]
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_COOLDOWN))
}
