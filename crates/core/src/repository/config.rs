use std::num::NonZeroUsize;
use std::time::Duration;

use crate::retry::{ConfigError, RetryConfig};

/// Default maximum keys per batch read call.
pub const DEFAULT_MAX_BATCH_GET: usize = 100;
/// Default maximum puts plus deletes per batch write call.
pub const DEFAULT_MAX_BATCH_WRITE: usize = 25;

/// Hard per-call item limits of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_batch_get: usize,
    pub max_batch_write: usize,
}

impl BatchLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_get == 0 {
            return Err(ConfigError::ZeroBatchLimit("max_batch_get"));
        }
        if self.max_batch_write == 0 {
            return Err(ConfigError::ZeroBatchLimit("max_batch_write"));
        }
        Ok(())
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_batch_get: DEFAULT_MAX_BATCH_GET,
            max_batch_write: DEFAULT_MAX_BATCH_WRITE,
        }
    }
}

/// Read-through/write-through cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    /// LRU cap; 0 means unbounded.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.max_entries)
    }
}

/// Fixed settings of one repository instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryConfig {
    pub table_name: String,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub limits: BatchLimits,
}

impl RepositoryConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            limits: BatchLimits::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }
}
