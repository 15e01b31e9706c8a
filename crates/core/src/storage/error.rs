use thiserror::Error;

/// Errors reported by a store client.
///
/// The first four kinds after `ConditionalCheckFailed` are transient and may
/// succeed when retried; everything else is permanent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conditional check failed: {0}")]
    ConditionalCheckFailed(String),
    #[error("Throughput exceeded: {0}")]
    ThroughputExceeded(String),
    #[error("Request throttled: {0}")]
    Throttled(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Returns true for transient faults worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ThroughputExceeded(_)
                | StoreError::Throttled(_)
                | StoreError::ServiceUnavailable(_)
                | StoreError::Network(_)
        )
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// One message per violated rule. Raised before any store I/O.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Item already exists in {table}: {key}")]
    ConditionalCheckFailed { table: String, key: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    /// Returns the validation messages if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&[String]> {
        match self {
            RepositoryError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
