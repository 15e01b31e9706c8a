//! Core for the entityrepo project.
//!
//! Store-agnostic building blocks for persistent-entity repositories:
//!
//! - [`storage`]: item and key types, the `StoreClient` trait, store errors
//!   and the update-expression builder
//! - [`retry`]: classified retry with exponential backoff
//! - [`cache`]: TTL cache with LRU eviction and hit/miss accounting
//! - [`repository`]: the generic `EntityRepository`

pub mod cache;
pub mod repository;
pub mod retry;
pub mod storage;
