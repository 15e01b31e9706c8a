//! Generic persistent-entity repository.
//!
//! An `EntityRepository` composes a `RetryExecutor`, an optional
//! `CacheStore` and a `StoreClient`, and delegates entity-specific behavior
//! to an `EntityHooks` implementation supplied per entity type.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let sites = EntityRepository::new(SiteHooks, store, RepositoryConfig::new("sites"))?;
//!
//! sites.put(&site, PutOptions::default()).await?;
//! let found = sites.get(&key_of([("siteId", "louvre")])).await?;
//! ```

mod config;
mod entity;
mod hooks;


pub use config::{
    BatchLimits, CacheConfig, RepositoryConfig, DEFAULT_MAX_BATCH_GET, DEFAULT_MAX_BATCH_WRITE,
};
pub use entity::{EntityRepository, PutOptions};
pub use hooks::{EntityHooks, ValidationResult};
