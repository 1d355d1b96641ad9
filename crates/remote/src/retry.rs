//! Retry logic with exponential backoff for artifact store requests

use crate::config::RetryConfig;
use crate::error::{RemoteError, Result};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, backoff::Backoff};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry a fallible async operation with exponential backoff
///
/// Non-retryable errors are returned as-is. When more than one attempt was
/// made and all of them failed, the result is [`RemoteError::RetryExhausted`].
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = create_backoff(config);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match f().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(
                        operation = operation_name,
                        attempts = attempts,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_retryable(&err) || attempts >= max_attempts => {
                if attempts == 1 {
                    return Err(err);
                }
                warn!(
                    operation = operation_name,
                    attempts = attempts,
                    error = %err,
                    "Operation failed after retries"
                );
                return Err(RemoteError::retry_exhausted(
                    operation_name,
                    attempts,
                    err.to_string(),
                ));
            }
            Err(err) => {
                let Some(duration) = backoff.next_backoff() else {
                    return Err(RemoteError::retry_exhausted(
                        operation_name,
                        attempts,
                        err.to_string(),
                    ));
                };
                warn!(
                    operation = operation_name,
                    attempts = attempts,
                    error = %err,
                    retry_in_ms = duration.as_millis(),
                    "Operation failed, retrying"
                );
                tokio::time::sleep(duration).await;
            }
        }
    }
}

/// Create exponential backoff from config
fn create_backoff(config: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
        .with_max_interval(Duration::from_millis(config.max_backoff_ms))
        .with_multiplier(config.backoff_multiplier)
        .with_max_elapsed_time(None) // We use max_attempts instead
        .build()
}

/// Determine if an error is worth another attempt
fn is_retryable(err: &RemoteError) -> bool {
    match err {
        RemoteError::Transport { .. } => true,

        // Server-side trouble and throttling
        RemoteError::Status { status, .. } => *status >= 500 || *status == 429,

        RemoteError::NotFound { .. }
        | RemoteError::Io { .. }
        | RemoteError::InvalidUrl { .. }
        | RemoteError::ClientBuild(_)
        | RemoteError::RetryExhausted { .. } => false,
    }
}
