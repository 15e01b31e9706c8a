use std::fmt::Display;
use std::future::Future;

use tokio_retry::RetryIf;

use crate::storage::StoreError;

use super::{ConfigError, RetryConfig};

/// Classifies an error as worth retrying or not.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        StoreError::is_retryable(self)
    }
}

/// Runs store calls with classified retry and exponential backoff.
///
/// Non-retryable errors are returned after the first attempt. Retryable
/// errors are retried up to `max_retries` times; when the budget runs out
/// the last error is returned as-is. Backoff sleeps use tokio timers, so
/// dropping the returned future stops any further attempts.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates an executor, rejecting invalid settings.
    pub fn new(config: RetryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `action` until it succeeds, fails permanently, or the retry
    /// budget is spent. `operation` only labels log lines.
    pub async fn execute<T, E, F, Fut>(&self, operation: &str, action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 0;

        let condition = |err: &E| {
            attempt += 1;
            if !err.is_retryable() {
                tracing::debug!(operation, attempt, error = %err, "Non-retryable store error");
                return false;
            }
            if attempt > max_retries {
                tracing::warn!(operation, attempts = attempt, error = %err, "Retries exhausted");
                return false;
            }
            tracing::warn!(
                operation,
                attempt,
                max_retries,
                delay_ms = self.config.delay_for_attempt(attempt).as_millis() as u64,
                error = %err,
                "Retryable store error, backing off"
            );
            true
        };

        RetryIf::spawn(self.config.backoff_schedule(), action, condition).await
    }
}
