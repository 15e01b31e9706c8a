use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors for out-of-range retry settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("baseDelayMs must be greater than 0")]
    ZeroBaseDelay,
    #[error("maxDelayMs ({max}) must be at least baseDelayMs ({base})")]
    MaxBelowBase { base: u64, max: u64 },
    #[error("backoffMultiplier must be greater than 1, got {0}")]
    MultiplierTooSmall(f64),
    #[error("{0} must be greater than 0")]
    ZeroBatchLimit(&'static str),
}

/// Retry and backoff settings for store calls.
///
/// The delay before retry `i` (1-based) is
/// `min(max_delay_ms, base_delay_ms * backoff_multiplier^(i-1))`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Scale each delay by a random factor in `[0, 1)`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Returns a config that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Checks the invariants between fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay_ms == 0 {
            return Err(ConfigError::ZeroBaseDelay);
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::MaxBelowBase {
                base: self.base_delay_ms,
                max: self.max_delay_ms,
            });
        }
        // Written this way so NaN is rejected too.
        if !(self.backoff_multiplier > 1.0) {
            return Err(ConfigError::MultiplierTooSmall(self.backoff_multiplier));
        }
        Ok(())
    }

    /// Delay before retry `attempt` (1-based), without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = (self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }

    /// The full sequence of inter-attempt delays, one per retry.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> {
        let config = self.clone();
        (1..=self.max_retries).map(move |attempt| {
            let delay = config.delay_for_attempt(attempt);
            if config.jitter {
                tokio_retry::strategy::jitter(delay)
            } else {
                delay
            }
        })
    }
}
