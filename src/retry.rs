//! Retry with exponential backoff for document fetches
//!
//! Document URLs are signed and short-lived, so retries are opt-in (see
//! [`FetchConfig::retry`](crate::config::FetchConfig::retry)). When enabled, only
//! transient failures are retried: timeouts, refused connections, `429` and `5xx`.
//! Disk errors and other HTTP statuses fail the job immediately.
//!
//! # Example
//!
//! ```no_run
//! use timeline_dl::config::RetryConfig;
//! use timeline_dl::retry::{IsRetryable, fetch_with_retry};
//!
//! #[derive(Debug)]
//! struct Busy;
//!
//! impl std::fmt::Display for Busy {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("server busy")
//!     }
//! }
//!
//! impl IsRetryable for Busy {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() -> Result<(), Busy> {
//! let config = RetryConfig::default();
//! let body = fetch_with_retry(&config, || async { Ok::<_, Busy>(b"%PDF".to_vec()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, FetchError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Classifies errors as transient (worth another attempt) or permanent
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            // local disk problems do not go away by asking the server again
            FetchError::CreateDir { .. } | FetchError::Write { .. } => false,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch(e) => e.is_retryable(),
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts
///
/// `config.max_attempts` counts retries, so the operation runs at most
/// `max_attempts + 1` times. Delays grow by `backoff_multiplier` up to `max_delay`.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Fetch succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Fetch failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(wait).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                    .min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = attempt + 1,
                        "Fetch failed, retries exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Stretch `delay` by a random factor between 1x and 2x
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}
