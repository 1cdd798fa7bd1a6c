//! Async utilities and patterns
//!
//! Retry with exponential backoff, deadlines, and bounded concurrency.

use crate::error::{ErrorContext, FathomError, FathomResult};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: usize,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (exponential backoff)
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry an async operation with exponential backoff
pub async fn retry_async<F, T, E>(
    operation: F,
    config: RetryConfig,
    operation_name: &str,
) -> Result<T, E>
where
    F: Fn() -> BoxFuture<'static, Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = config.max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt >= config.max_attempts {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %err,
                        "Operation failed after all retry attempts"
                    );
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %err,
                    delay_ms = delay,
                    "Operation failed, retrying"
                );

                let actual_delay = if config.jitter {
                    let jitter_factor = 0.1;
                    let jitter = (fastrand::f64() - 0.5) * 2.0 * jitter_factor;
                    ((delay as f64) * (1.0 + jitter)) as u64
                } else {
                    delay
                };

                sleep(Duration::from_millis(actual_delay)).await;

                delay = ((delay as f64) * config.backoff_multiplier) as u64;
                delay = delay.min(config.max_delay_ms);
            }
        }
    }
}

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> FathomResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(FathomError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase the timeout")
                .with_suggestion("Check network connectivity"),
        }),
    }
}

/// Run a worker over every item with bounded parallelism, preserving the
/// input order of results.
///
/// Runs inside the calling task (no spawn), so workers may borrow from the
/// caller's scope.
pub async fn process_concurrently<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrent: usize,
    worker: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: std::future::Future<Output = R>,
{
    stream::iter(items)
        .map(worker)
        .buffered(max_concurrent.max(1))
        .collect()
        .await
}
