//! Sliding-window rate limiter shared by every exchange instance.
//!
//! A single mutex guards a queue of request timestamps within the past
//! second. A caller whose slot would exceed the configured rate sleeps
//! until the oldest timestamp falls out of the window before recording
//! its own and proceeding.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

const WINDOW: Duration = Duration::from_secs(1);

/// Point-in-time counters for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimiterStats {
    /// Total number of `acquire` calls that returned immediately.
    pub immediate: u64,
    /// Total number of `acquire` calls that had to sleep first.
    pub throttled: u64,
}

/// Sliding-window rate limiter, one per exchange instance.
pub struct RateLimiter {
    limit: u32,
    timestamps: Mutex<VecDeque<Instant>>,
    stats: Mutex<RateLimiterStats>,
}

impl RateLimiter {
    /// Construct a limiter allowing `limit` requests per second.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            timestamps: Mutex::new(VecDeque::with_capacity(limit as usize + 1)),
            stats: Mutex::new(RateLimiterStats::default()),
        }
    }

    /// Current counters, for dashboards/logging.
    #[must_use]
    pub fn stats(&self) -> RateLimiterStats {
        *self.stats.lock()
    }

    /// Block (asynchronously) until a request slot is available, then
    /// record it. Thread-safe: only one caller inspects the timestamp
    /// queue at a time.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock();
                let now = Instant::now();
                while let Some(&oldest) = timestamps.front() {
                    if now.duration_since(oldest) >= WINDOW {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }

                if (timestamps.len() as u32) < self.limit {
                    timestamps.push_back(now);
                    let mut stats = self.stats.lock();
                    if timestamps.len() == 1 {
                        stats.immediate += 1;
                    }
                    None
                } else {
                    let oldest = *timestamps.front().expect("limit >= 1 implies non-empty");
                    Some(WINDOW.saturating_sub(now.duration_since(oldest)))
                }
            };

            match wait {
                None => return,
                Some(duration) => {
                    self.stats.lock().throttled += 1;
                    trace!(wait_ms = duration.as_millis(), "rate limit: sleeping");
                    tokio::time::sleep(duration).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn twenty_requests_at_rate_ten_takes_between_one_and_two_seconds() {
        let limiter = Arc::new(RateLimiter::new(10));
        let start = Instant::now();
        for _ in 0..20 {
            limiter.acquire().await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(950), "elapsed={elapsed:?}");
        assert!(elapsed <= Duration::from_secs(2), "elapsed={elapsed:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_callers_never_exceed_the_limit_within_a_window() {
        let limiter = Arc::new(RateLimiter::new(5));
        let mut handles = Vec::new();
        for _ in 0..15 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut timestamps = Vec::new();
        for handle in handles {
            timestamps.push(handle.await.unwrap());
        }
        timestamps.sort();

        // No window of six consecutive timestamps may span less than
        // the rate window: that would mean six requests inside 1s.
        for pair in timestamps.windows(6) {
            let span = pair[5].duration_since(pair[0]);
            assert!(
                span >= Duration::from_millis(900),
                "six requests within {span:?}"
            );
        }
    }

    #[tokio::test]
    async fn single_request_never_sleeps() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(limiter.stats().immediate, 1);
        assert_eq!(limiter.stats().throttled, 0);
    }
}
