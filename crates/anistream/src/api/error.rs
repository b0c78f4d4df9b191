//! Error taxonomy of the API client.

use std::time::Duration;

/// Failure of a single upstream request
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// HTTP 429, optionally with the server-declared `Retry-After`
    #[error("Rate limited by upstream API (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Any non-429 HTTP failure status
    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Whether this failure is a rate-limit rejection
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    /// Server-declared cool-down, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_helpers() {
        let err = ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(10)),
        };
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(10)));

        let err = ApiError::Status {
            status: 500,
            url: "http://localhost/latest".to_string(),
        };
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
        assert!(err.to_string().contains("500"));
    }
}
