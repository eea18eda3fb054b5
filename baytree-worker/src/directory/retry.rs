/// Retry with capped exponential backoff for idempotent directory reads
///
/// Only errors for which [`DirectoryError::is_transient`] holds are retried.
/// A 429 waits for the server's `Retry-After`, capped at `max_delay`.

use super::error::DirectoryError;
use std::future::Future;
use std::time::Duration;

/// Retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Policy allowing `max_retries` retries after the first attempt
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            ..Default::default()
        }
    }

    fn wait_for(&self, err: &DirectoryError, backoff: Duration) -> Duration {
        match err {
            DirectoryError::RateLimited { retry_after_secs } => {
                Duration::from_secs(*retry_after_secs).min(self.max_delay)
            }
            _ => backoff,
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, or attempts run out
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut f: F,
) -> Result<T, DirectoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DirectoryError>>,
{
    let mut backoff = config.base_delay;
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.max_attempts => {
                let wait = config.wait_for(&e, backoff);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = wait.as_millis() as u64,
                    error = %e,
                    "Transient directory error, retrying"
                );
                tokio::time::sleep(wait).await;
                backoff = std::cmp::min(backoff * 2, config.max_delay);
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!(operation, attempts = attempt, error = %e, "Directory retries exhausted");
                }
                return Err(e);
            }
        }
    }
}
