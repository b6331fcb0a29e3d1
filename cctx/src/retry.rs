//! Retry-with-backoff wrapper around a fallible async operation.
//!
//! Every attempt first takes a [`RateLimiter`] slot, so retries never
//! bypass the shared rate budget. Only [`Error::is_retryable`] kinds are
//! retried; everything else returns immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{Error, Result};
use crate::ratelimit::RateLimiter;

/// Run `operation` up to `max_retries + 1` times, honouring
/// `rate_limiter` and sleeping `retry_delay * (retry_backoff * attempt) +
/// U(0, 1s)` between attempts (minimum one `retry_delay` unit).
///
/// # Errors
///
/// Returns the first non-retryable error immediately, or the last
/// error observed after exhausting all attempts.
pub async fn with_retry<F, Fut, T>(
    rate_limiter: &RateLimiter,
    max_retries: u32,
    retry_delay: Duration,
    retry_backoff: f64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..=max_retries {
        rate_limiter.acquire().await;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "retryable error, will back off");
                last_err = Some(err);
                if attempt < max_retries {
                    let sleep_for = backoff_delay(retry_delay, retry_backoff, attempt);
                    tokio::time::sleep(sleep_for).await;
                }
            }
        }
    }

    Err(last_err.expect("loop runs at least once since max_retries + 1 >= 1"))
}

fn backoff_delay(retry_delay: Duration, retry_backoff: f64, attempt: u32) -> Duration {
    let jitter_secs: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let scaled = retry_delay.mul_f64(retry_backoff * f64::from(attempt));
    let with_jitter = scaled + Duration::from_secs_f64(jitter_secs);
    with_jitter.max(retry_delay)
}
