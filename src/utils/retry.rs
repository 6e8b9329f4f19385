//! Bounded Retry Module
//!
//! Backoff policy for provider fetches: delay = base_delay * attempt number,
//! plus random jitter to prevent thundering herd. Only network and rate-limit
//! errors are retried; provider application errors pass straight through so
//! the mode selector can fall back instead.
//!
//! A rate limit on the final attempt surfaces as a rate-limit error, never as
//! a silent success or a generic failure.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::RETRY_JITTER_PERCENT;

/// Run `op` with up to `max_retries` retries (max_retries + 1 total attempts)
pub async fn with_retry<T, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut last_error: Option<AppError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let base = base_delay.as_millis() as u64 * attempt as u64;
            let jitter_range = (base * RETRY_JITTER_PERCENT) / 100;
            let jitter: i64 = if jitter_range > 0 {
                rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64))
            } else {
                0
            };
            let delay = (base as i64 + jitter).max(10) as u64;

            debug!(
                "⏳ Retry {}/{} after {}ms (base: {}ms, jitter: {}ms)",
                attempt, max_retries, delay, base, jitter
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                if e.is_rate_limit() {
                    warn!(
                        "⏳ Rate limited, backing off (attempt {}/{})",
                        attempt + 1,
                        max_retries + 1
                    );
                }
                last_error = Some(e);
            }
            // Non-retryable, or retryable on the final attempt: surface as-is
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::new(ErrorCode::Unknown, "Retry loop exhausted")))
}
