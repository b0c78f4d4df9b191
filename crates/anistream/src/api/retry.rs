//! Retry policy for rate-limited requests.

use super::error::{ApiError, ApiResult};
use super::rate_limiter::{RateLimiter, MAX_COOLDOWN};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retries an operation only when it is rejected with a rate limit
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    max_attempts: u32,
    /// Base delay for exponential backoff
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Backoff before the attempt following `attempt` (zero-based), capped at
    /// [`MAX_COOLDOWN`]
    fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .or_else(|| self.base_delay.checked_mul(2u32.saturating_pow(attempt)))
            .map_or(MAX_COOLDOWN, |delay| delay.min(MAX_COOLDOWN))
    }

    /// Run `operation` until it succeeds, fails with a non-rate-limit error,
    /// or `max_attempts` attempts have been made.
    ///
    /// Every rejection installs the computed delay as a cool-down on `limiter`
    /// so unrelated operations observe it too. Exhausting the attempts returns
    /// the last rate-limit error.
    pub async fn run<T, F, Fut>(&self, limiter: &RateLimiter, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e @ ApiError::RateLimited { .. }) => {
                    let delay = self.backoff(attempt, e.retry_after());
                    limiter.report_rate_limited(delay);
                    attempt += 1;

                    if attempt >= self.max_attempts {
                        warn!(attempts = attempt, "Rate limited, giving up");
                        return Err(e);
                    }

                    warn!(
                        attempt = attempt,
                        delay_secs = delay.as_secs_f64().ceil() as u64,
                        "API rate limited, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(3_000))
    }
}
