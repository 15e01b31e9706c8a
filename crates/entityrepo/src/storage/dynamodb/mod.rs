//! DynamoDB storage backend implementation.
//!
//! A `StoreClient` over `aws-sdk-dynamodb`. Items cross the boundary as JSON
//! maps and are converted to and from `AttributeValue` maps here.

mod client;
mod conversions;
mod error;

pub use client::{AwsConfig, DynamoDbStore, DEFAULT_UNPROCESSED_ROUNDS};
pub use error::classify_error_code;
