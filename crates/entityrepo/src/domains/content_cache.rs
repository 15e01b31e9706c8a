use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use entityrepo_core::cache::prefixed_cache_key;
use entityrepo_core::repository::{EntityHooks, ValidationResult};
use entityrepo_core::storage::{key_of, Key};

/// Generated content for one artifact in one language and format, kept so
/// it is not regenerated on every visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCacheEntry {
    pub content_key: String,
    pub site_id: String,
    pub artifact_id: String,
    pub language: String,
    /// e.g. `text`, `audio-script`
    pub content_type: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ContentCacheEntry {
    pub const KEY_FIELDS: &'static [&'static str] = &["contentKey"];

    /// Creates an entry whose key is derived from its coordinates.
    pub fn new(
        site_id: impl Into<String>,
        artifact_id: impl Into<String>,
        language: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        let site_id = site_id.into();
        let artifact_id = artifact_id.into();
        let language = language.into();
        let content_type = content_type.into();
        let now = Utc::now();
        Self {
            content_key: Self::content_key_for(&site_id, &artifact_id, &language, &content_type),
            site_id,
            artifact_id,
            language,
            content_type,
            body: body.into(),
            created_at: now,
            expires_at: now + lifetime,
        }
    }

    /// `{siteId}#{artifactId}#{language}#{contentType}`
    pub fn content_key_for(
        site_id: &str,
        artifact_id: &str,
        language: &str,
        content_type: &str,
    ) -> String {
        format!("{site_id}#{artifact_id}#{language}#{content_type}")
    }

    pub fn key(content_key: &str) -> Key {
        key_of([("contentKey", content_key)])
    }
}

pub struct ContentCacheHooks;

impl EntityHooks for ContentCacheHooks {
    type Entity = ContentCacheEntry;

    fn validate_entity(&self, entry: &ContentCacheEntry) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_non_empty(&entry.content_key, "contentKey")
            .require_non_empty(&entry.body, "body");
        result
    }

    fn primary_key(&self, entry: &ContentCacheEntry) -> Key {
        ContentCacheEntry::key(&entry.content_key)
    }

    fn cache_key(&self, key: &Key) -> String {
        prefixed_cache_key("content", key, ContentCacheEntry::KEY_FIELDS)
    }
}
