//! Per-source, per-run rate limiting.
//!
//! One limiter exists per source per aggregation run. It enforces the
//! source's minimum inter-request delay and its per-run request budget;
//! state does not survive the run.

use std::time::Instant;

use tokio::sync::Mutex;
use tracing::debug;

use super::config::RateLimitConfig;
use super::error::ScrapeError;

#[derive(Debug)]
struct LimiterState {
    last_request: Option<Instant>,
    used: u32,
}

/// Token/delay gate for one source within one run.
///
/// Multiple pagination steps of the same source may race on `acquire`; the
/// mutex gives the required single-writer-at-a-time semantics.
#[derive(Debug)]
pub struct RunLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RunLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState {
                last_request: None,
                used: 0,
            }),
        }
    }

    /// Suspend until the next request is permitted, or fail once the per-run
    /// budget is spent. Must be called before every page fetch.
    pub async fn acquire(&self) -> Result<(), ScrapeError> {
        let wait = {
            let mut state = self.state.lock().await;
            if state.used >= self.config.max_requests {
                return Err(ScrapeError::RateLimitExceeded {
                    max: self.config.max_requests,
                });
            }
            state.used += 1;

            let delay = self.config.delay();
            let wait = match state.last_request {
                Some(last) => delay.saturating_sub(last.elapsed()),
                None => std::time::Duration::ZERO,
            };
            // Claim the slot before sleeping so a concurrent acquirer queues
            // behind this request rather than alongside it.
            state.last_request = Some(Instant::now() + wait);
            wait
        };

        if !wait.is_zero() {
            debug!("rate limit wait {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }

    /// Requests spent so far in this run.
    pub async fn used(&self) -> u32 {
        self.state.lock().await.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(delay_ms: u64, max_requests: u32) -> RunLimiter {
        RunLimiter::new(RateLimitConfig {
            delay_ms,
            max_requests,
        })
    }

    #[tokio::test]
    async fn test_budget_boundary() {
        let limiter = limiter(0, 3);
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, ScrapeError::RateLimitExceeded { max: 3 }));
        assert_eq!(limiter.used().await, 3);
    }

    #[tokio::test]
    async fn test_delay_between_requests() {
        let limiter = limiter(50, 10);
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        // Two inter-request gaps of 50ms each.
        assert!(start.elapsed() >= std::time::Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = limiter(5_000, 1);
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() < std::time::Duration::from_millis(100));
    }
}
