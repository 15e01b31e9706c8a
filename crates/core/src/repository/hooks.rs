use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::default_cache_key;
use crate::storage::Key;

/// Outcome of validating an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a violation when `condition` is false.
    pub fn require(&mut self, condition: bool, message: impl Into<String>) -> &mut Self {
        if !condition {
            self.errors.push(message.into());
        }
        self
    }

    /// Records a violation when `value` is empty or whitespace.
    pub fn require_non_empty(&mut self, value: &str, field: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), format!("{field} is required"))
    }
}

/// Entity-specific behavior plugged into an `EntityRepository`.
pub trait EntityHooks: Send + Sync {
    type Entity: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Checks an entity before it is written.
    fn validate_entity(&self, entity: &Self::Entity) -> ValidationResult;

    /// Projects the primary-key fields of an entity.
    fn primary_key(&self, entity: &Self::Entity) -> Key;

    /// Maps a primary key to its cache key. Must be a pure function of the
    /// key and unique per distinct key.
    fn cache_key(&self, key: &Key) -> String {
        default_cache_key(key)
    }
}
