//! Entity types and their repository hooks.
//!
//! Each domain pairs a serde entity (camelCase on the wire) with an
//! `EntityHooks` implementation: validation, primary-key projection and
//! cache-key derivation.

mod artifact;
mod content_cache;
mod session;
mod site;

pub use artifact::{Artifact, ArtifactHooks};
pub use content_cache::{ContentCacheEntry, ContentCacheHooks};
pub use session::{Session, SessionHooks};
pub use site::{Site, SiteHooks};
