//! Retry Logic
//!
//! Exponential backoff retry with jitter, driven by
//! [`ApiError::is_retryable`] and any server-supplied `Retry-After`.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        DEFAULT_RETRY_CONFIG
    }
}

/// Default retry configuration.
pub const DEFAULT_RETRY_CONFIG: RetryConfig = RetryConfig {
    max_attempts: 3,
    initial_delay: Duration::from_millis(100),
    max_delay: Duration::from_secs(10),
    multiplier: 2.0,
    jitter: 0.1,
};

/// Retry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub total_attempts: u32,
    pub successful_retries: u32,
    pub failed_operations: u32,
}

/// Retries operations whose errors are retryable.
pub struct RetryExecutor {
    config: RetryConfig,
    stats: Mutex<RetryStats>,
}

impl RetryExecutor {
    /// Create new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(RetryStats::default()),
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The last error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            self.stats.lock().total_attempts += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.stats.lock().successful_retries += 1;
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_retryable() || attempt + 1 >= max_attempts {
                        self.stats.lock().failed_operations += 1;
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error_code = error.error_code(),
                        "Retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get retry statistics.
    pub fn stats(&self) -> RetryStats {
        self.stats.lock().clone()
    }

    fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        match error.retry_after() {
            Some(requested) => requested.min(self.config.max_delay),
            None => self.calculate_delay(attempt),
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay.as_millis() as f64
            * self.config.multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.config.max_delay.as_millis() as f64);

        let jitter_range = capped_delay * self.config.jitter;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
