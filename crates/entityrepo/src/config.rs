use std::{env, str::FromStr, time::Duration};

use entityrepo_core::repository::CacheConfig;
use entityrepo_core::retry::RetryConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Sites table name (default: "sites")
    pub sites_table: String,
    /// Artifacts table name (default: "artifacts")
    pub artifacts_table: String,
    /// Sessions table name (default: "sessions")
    pub sessions_table: String,
    /// Content cache table name (default: "content-cache")
    pub content_cache_table: String,
    /// Retries after the first store attempt (default: 3)
    pub store_max_retries: u32,
    /// First backoff delay in milliseconds (default: 100)
    pub store_base_delay_ms: u64,
    /// Backoff delay cap in milliseconds (default: 5,000)
    pub store_max_delay_ms: u64,
    /// Backoff growth factor (default: 2.0)
    pub store_backoff_multiplier: f64,
    /// Whether repositories cache reads (default: true)
    pub cache_enabled: bool,
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries per repository, 0 for no cap (default: 10,000)
    pub cache_max_entries: usize,
    /// Cache TTL for generated content in seconds (default: 3,600)
    pub content_cache_ttl_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SITES_TABLE`, `ARTIFACTS_TABLE`, `SESSIONS_TABLE`, `CONTENT_CACHE_TABLE`
    /// - `STORE_MAX_RETRIES` - Retries after the first attempt (default: 3)
    /// - `STORE_BASE_DELAY_MS` - First backoff delay (default: 100)
    /// - `STORE_MAX_DELAY_MS` - Backoff delay cap (default: 5,000)
    /// - `STORE_BACKOFF_MULTIPLIER` - Backoff growth factor (default: 2.0)
    /// - `CACHE_ENABLED` - `true`/`false` (default: true)
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `CONTENT_CACHE_TTL_SECONDS` - Content cache TTL (default: 3,600)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Self {
            sites_table: text("SITES_TABLE", "sites"),
            artifacts_table: text("ARTIFACTS_TABLE", "artifacts"),
            sessions_table: text("SESSIONS_TABLE", "sessions"),
            content_cache_table: text("CONTENT_CACHE_TABLE", "content-cache"),
            store_max_retries: parsed(&lookup, "STORE_MAX_RETRIES", 3),
            store_base_delay_ms: parsed(&lookup, "STORE_BASE_DELAY_MS", 100),
            store_max_delay_ms: parsed(&lookup, "STORE_MAX_DELAY_MS", 5_000),
            store_backoff_multiplier: parsed(&lookup, "STORE_BACKOFF_MULTIPLIER", 2.0),
            cache_enabled: parsed(&lookup, "CACHE_ENABLED", true),
            cache_ttl_seconds: parsed(&lookup, "CACHE_TTL_SECONDS", 300),
            cache_max_entries: parsed(&lookup, "CACHE_MAX_ENTRIES", 10_000),
            content_cache_ttl_seconds: parsed(&lookup, "CONTENT_CACHE_TTL_SECONDS", 3_600),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Get content cache TTL as a Duration.
    pub fn content_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.content_cache_ttl_seconds)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.store_max_retries,
            base_delay_ms: self.store_base_delay_ms,
            max_delay_ms: self.store_max_delay_ms,
            backoff_multiplier: self.store_backoff_multiplier,
            ..RetryConfig::default()
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache_enabled,
            ttl: self.cache_ttl(),
            max_entries: self.cache_max_entries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "Ignoring unparseable setting");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]);

        assert_eq!(config.sites_table, "sites");
        assert_eq!(config.content_cache_table, "content-cache");
        assert_eq!(config.store_max_retries, 3);
        assert_eq!(config.store_base_delay_ms, 100);
        assert_eq!(config.store_max_delay_ms, 5_000);
        assert_eq!(config.store_backoff_multiplier, 2.0);
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.retry_config(), RetryConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("SITES_TABLE", "prod-sites"),
            ("STORE_MAX_RETRIES", "5"),
            ("STORE_BACKOFF_MULTIPLIER", "1.5"),
            ("CACHE_ENABLED", "false"),
            ("CACHE_MAX_ENTRIES", "0"),
        ]);

        assert_eq!(config.sites_table, "prod-sites");
        assert_eq!(config.retry_config().max_retries, 5);
        assert_eq!(config.retry_config().backoff_multiplier, 1.5);
        assert!(!config.cache_config().enabled);
        assert_eq!(config.cache_config().capacity(), None);
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = from_pairs(&[("STORE_MAX_RETRIES", "many"), ("CACHE_TTL_SECONDS", "-1")]);

        assert_eq!(config.store_max_retries, 3);
        assert_eq!(config.cache_ttl_seconds, 300);
    }

    #[test]
    fn test_cache_ttl_conversion() {
        let config = from_pairs(&[("CACHE_TTL_SECONDS", "600")]);

        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.content_cache_ttl(), Duration::from_secs(3_600));
    }
}
