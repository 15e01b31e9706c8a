//! In-memory storage backend for testing.
//!
//! Provides an in-memory `StoreClient` that keeps every table in a
//! `BTreeMap` wrapped in `Arc<RwLock<_>>`. Useful for tests and local
//! development where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use entityrepo::storage::inmemory::InMemoryStore;
//!
//! let store = InMemoryStore::with_tables([("sites", &["siteId"][..])]);
//! ```

mod expression;
mod store;

pub use store::InMemoryStore;
