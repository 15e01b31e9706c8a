//! Classified retry with exponential backoff for store calls.
//!
//! State machine per call:
//!
//! ```text
//! Idle -> Attempting(1) -> Success
//!                       -> non-retryable error  -> propagate
//!                       -> retryable error      -> sleep -> Attempting(i + 1)   (while i <= max_retries)
//!                       -> budget exhausted     -> propagate last error
//! ```

mod config;
mod executor;

pub use config::{ConfigError, RetryConfig};
pub use executor::{RetryExecutor, Retryable};
