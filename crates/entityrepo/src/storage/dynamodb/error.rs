//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `StoreError` from `entityrepo_core::storage`. The
//! classification itself works on the service error code so it can be
//! tested without a live SDK error.

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use entityrepo_core::storage::StoreError;

/// Classify a DynamoDB service error code.
pub fn classify_error_code(code: Option<&str>, message: impl Into<String>) -> StoreError {
    let message = message.into();
    match code {
        Some("ConditionalCheckFailedException") => StoreError::ConditionalCheckFailed(message),
        Some("ProvisionedThroughputExceededException") => StoreError::ThroughputExceeded(message),
        Some("ThrottlingException")
        | Some("RequestLimitExceeded")
        | Some("TransactionConflictException") => StoreError::Throttled(message),
        Some("InternalServerError")
        | Some("InternalFailure")
        | Some("ServiceUnavailable")
        | Some("ServiceUnavailableException") => StoreError::ServiceUnavailable(message),
        Some("ResourceNotFoundException") => StoreError::ResourceNotFound(message),
        Some("ValidationException")
        | Some("SerializationException")
        | Some("ItemCollectionSizeLimitExceededException") => StoreError::InvalidRequest(message),
        Some("AccessDeniedException")
        | Some("UnrecognizedClientException")
        | Some("MissingAuthenticationTokenException")
        | Some("ExpiredTokenException") => StoreError::AccessDenied(message),
        Some(code) => StoreError::Other(format!("{code}: {message}")),
        None => StoreError::Other(message),
    }
}

/// Map an SDK error of any DynamoDB operation to `StoreError`.
///
/// Timeouts and dispatch failures never reached the service and are
/// reported as transient network errors.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(service) => {
            let inner = service.err();
            classify_error_code(inner.code(), inner.message().unwrap_or_default())
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Network(DisplayErrorContext(&err).to_string())
        }
        SdkError::ConstructionFailure(_) => {
            StoreError::InvalidRequest(DisplayErrorContext(&err).to_string())
        }
        _ => StoreError::Other(DisplayErrorContext(&err).to_string()),
    }
}

/// Map a request builder error (missing required field) to `StoreError`.
pub fn map_build_error(err: BuildError) -> StoreError {
    StoreError::InvalidRequest(err.to_string())
}
