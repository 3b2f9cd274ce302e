//! Retry policy with exponential backoff and jitter.
//!
//! The same policy drives two things: how long the step engine waits before
//! re-invoking a step that asked to be retried, and how the Kubernetes event
//! sink retries transient API failures.

use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// Retry budget and backoff shape.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retries after the first try (0 = never retry)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier applied per retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with a maximum number of retries
    pub fn with_max_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Un-jittered backoff for the given retry number (1-based), capped at `max_delay`
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before retry number `retry` when the step asked for `requested`
    ///
    /// The larger of the request and the backoff wins, jittered by 0.5x to
    /// 1.5x, then capped at `max_delay`.
    pub fn delay_for(&self, retry: u32, requested: Duration) -> Duration {
        let base = requested.max(self.backoff(retry));
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let jittered = base.as_secs_f64() * jitter;
        Duration::from_secs_f64(jittered.min(self.max_delay.as_secs_f64()))
    }
}

/// Execute an async operation, retrying failures with backoff.
///
/// Runs the operation once, then up to `config.max_retries` more times.
/// Returns the last error once the budget is spent.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if retry >= config.max_retries {
                    error!(
                        operation = %operation_name,
                        retries = retry,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }
                retry += 1;

                let delay = config.delay_for(retry, Duration::ZERO);
                warn!(
                    operation = %operation_name,
                    retry,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
