//! Explicit wiring of every domain repository over one shared store.

use std::sync::Arc;

use entityrepo_core::repository::{EntityRepository, RepositoryConfig};
use entityrepo_core::retry::ConfigError;
use entityrepo_core::storage::StoreClient;

use crate::config::Config;
use crate::domains::{ArtifactHooks, ContentCacheHooks, SessionHooks, SiteHooks};

/// One repository per domain, all sharing the same store client.
///
/// Sessions are never cached; content cache entries use their own TTL.
pub struct Repositories<S: StoreClient + ?Sized> {
    pub sites: EntityRepository<SiteHooks, S>,
    pub artifacts: EntityRepository<ArtifactHooks, S>,
    pub sessions: EntityRepository<SessionHooks, S>,
    pub content_cache: EntityRepository<ContentCacheHooks, S>,
}

impl<S: StoreClient + ?Sized> Repositories<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Result<Self, ConfigError> {
        let retry = config.retry_config();
        let cache = config.cache_config();
        let base = |table: &str| {
            RepositoryConfig::new(table)
                .with_retry(retry.clone())
                .with_cache(cache)
        };

        Ok(Self {
            sites: EntityRepository::new(SiteHooks, store.clone(), base(&config.sites_table))?,
            artifacts: EntityRepository::new(
                ArtifactHooks,
                store.clone(),
                base(&config.artifacts_table),
            )?,
            sessions: EntityRepository::new(
                SessionHooks,
                store.clone(),
                base(&config.sessions_table).without_cache(),
            )?,
            content_cache: EntityRepository::new(
                ContentCacheHooks,
                store,
                base(&config.content_cache_table).with_cache_ttl(config.content_cache_ttl()),
            )?,
        })
    }
}

#[cfg(feature = "inmemory")]
mod inmemory {
    use std::sync::Arc;

    use entityrepo_core::retry::ConfigError;

    use super::Repositories;
    use crate::config::Config;
    use crate::domains::{Artifact, ContentCacheEntry, Session, Site};
    use crate::storage::InMemoryStore;

    /// Builds an in-memory store with every domain table registered.
    pub fn in_memory_store(config: &Config) -> InMemoryStore {
        InMemoryStore::with_tables([
            (config.sites_table.as_str(), Site::KEY_FIELDS),
            (config.artifacts_table.as_str(), Artifact::KEY_FIELDS),
            (config.sessions_table.as_str(), Session::KEY_FIELDS),
            (config.content_cache_table.as_str(), ContentCacheEntry::KEY_FIELDS),
        ])
    }

    impl Repositories<InMemoryStore> {
        /// Wires every repository over a fresh in-memory store.
        pub fn in_memory(config: &Config) -> Result<Self, ConfigError> {
            Self::new(Arc::new(in_memory_store(config)), config)
        }
    }
}

#[cfg(feature = "inmemory")]
pub use inmemory::in_memory_store;
