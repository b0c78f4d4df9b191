//! Throttle gate shared by every outbound request.
//!
//! Enforces a minimum spacing between requests and honors the cool-down
//! installed after a rate-limit rejection. One limiter is owned by each
//! client; clones share the same state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Longest cool-down ever installed, whatever the server asks for
pub const MAX_COOLDOWN: Duration = Duration::from_secs(600);

#[derive(Debug, Default)]
struct RateLimitState {
    /// Dispatch time of the most recent request
    last_request: Option<Instant>,
    /// No request may be dispatched before this instant
    retry_after: Option<Instant>,
}

/// Rate limiter with a fixed minimum interval and a server-driven cool-down
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    state: Arc<Mutex<RateLimitState>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Arc::new(Mutex::new(RateLimitState::default())),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request can be made.
    ///
    /// The state is read and the dispatch slot claimed under one lock with no
    /// suspension in between; a caller that had to sleep re-checks from
    /// scratch, so concurrent callers may over-wait but never under-space.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.lock();
                let now = Instant::now();

                match state.retry_after {
                    Some(until) if now < until => Some((until - now, true)),
                    _ => {
                        state.retry_after = None;
                        match state.last_request {
                            Some(last) if now.duration_since(last) < self.min_interval => {
                                Some((self.min_interval - now.duration_since(last), false))
                            }
                            _ => {
                                state.last_request = Some(now);
                                None
                            }
                        }
                    }
                }
            };

            match wait {
                None => return,
                Some((wait, true)) => {
                    tracing::warn!(
                        wait_secs = wait.as_secs_f64().ceil() as u64,
                        "API rate limited, waiting for cool-down"
                    );
                    sleep(wait).await;
                }
                Some((wait, false)) => {
                    tracing::debug!(
                        wait_ms = wait.as_millis() as u64,
                        "Rate limit: waiting for minimum interval"
                    );
                    sleep(wait).await;
                }
            }
        }
    }

    /// Install a cool-down of `delay` starting now, capped at [`MAX_COOLDOWN`].
    ///
    /// A longer cool-down already in force is kept.
    pub fn report_rate_limited(&self, delay: Duration) {
        let delay = delay.min(MAX_COOLDOWN);
        let until = Instant::now() + delay;
        let mut state = self.lock();
        if state.retry_after.map_or(true, |current| current < until) {
            state.retry_after = Some(until);
            tracing::warn!(
                cooldown_ms = delay.as_millis() as u64,
                "Cool-down installed after rate-limit rejection"
            );
        }
    }

    /// Remaining cool-down, if one is in force
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        self.lock()
            .retry_after
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_successive_requests_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(3_500));

        let mut dispatched = Vec::new();
        for _ in 0..4 {
            limiter.acquire().await;
            dispatched.push(Instant::now());
        }

        for pair in dispatched.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(3_500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(3_500));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut dispatched = Vec::new();
        for task in tasks {
            dispatched.push(task.await.unwrap());
        }
        dispatched.sort();

        for pair in dispatched.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_blocks_dispatch() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.report_rate_limited(Duration::from_secs(10));
        assert!(limiter.cooldown_remaining().is_some());

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(limiter.cooldown_remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_cooldown_does_not_shorten() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.report_rate_limited(Duration::from_secs(30));
        limiter.report_rate_limited(Duration::from_secs(5));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_cooldown_is_capped() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.report_rate_limited(Duration::from_secs(u64::MAX));
        assert_eq!(limiter.cooldown_remaining(), Some(MAX_COOLDOWN));

        limiter.acquire().await;
        assert_eq!(start.elapsed(), MAX_COOLDOWN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_reported_while_waiting() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.acquire().await;
        let start = Instant::now();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            })
        };

        // Let the waiter start sleeping on the interval, then install a cool-down
        tokio::time::sleep(Duration::from_millis(500)).await;
        limiter.report_rate_limited(Duration::from_secs(20));

        let dispatched = waiter.await.unwrap();
        assert!(dispatched - start >= Duration::from_millis(20_500));
    }
}
