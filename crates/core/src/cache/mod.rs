mod keys;
mod store;

pub use keys::{default_cache_key, prefixed_cache_key};
pub use store::{CacheStats, CacheStore};
