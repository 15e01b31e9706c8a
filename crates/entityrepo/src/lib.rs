//! entityrepo - domain repositories over pluggable stores.
//!
//! Wires the generic `EntityRepository` from `entityrepo_core` to concrete
//! store backends and to the site, artifact, session and content-cache
//! domains.

pub mod cli;
pub mod config;
pub mod domains;
pub mod repositories;
pub mod storage;

pub use config::Config;
pub use repositories::Repositories;
