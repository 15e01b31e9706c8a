use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entityrepo_core::cache::prefixed_cache_key;
use entityrepo_core::repository::{EntityHooks, ValidationResult};
use entityrepo_core::storage::{key_of, Key, QueryParams};

/// An exhibit within a site, identified per site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub site_id: String,
    pub artifact_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Payload encoded in the artifact's printed QR code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub const KEY_FIELDS: &'static [&'static str] = &["siteId", "artifactId"];

    /// Creates a new artifact with a random ID in the given site.
    pub fn new(site_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            site_id: site_id.into(),
            artifact_id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            qr_code: None,
            media_urls: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets a specific ID for this artifact.
    pub fn with_id(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = artifact_id.into();
        self
    }

    pub fn with_qr_code(mut self, qr_code: impl Into<String>) -> Self {
        self.qr_code = Some(qr_code.into());
        self
    }

    pub fn with_media_url(mut self, url: impl Into<String>) -> Self {
        self.media_urls.push(url.into());
        self
    }

    pub fn key(site_id: &str, artifact_id: &str) -> Key {
        key_of([("siteId", site_id), ("artifactId", artifact_id)])
    }

    /// Query for every artifact of one site.
    pub fn by_site(site_id: &str) -> QueryParams {
        QueryParams::new("#siteId = :siteId")
            .name("#siteId", "siteId")
            .value(":siteId", site_id)
    }
}

pub struct ArtifactHooks;

impl EntityHooks for ArtifactHooks {
    type Entity = Artifact;

    fn validate_entity(&self, artifact: &Artifact) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_non_empty(&artifact.site_id, "siteId")
            .require_non_empty(&artifact.artifact_id, "artifactId")
            .require_non_empty(&artifact.name, "name");
        result
    }

    fn primary_key(&self, artifact: &Artifact) -> Key {
        Artifact::key(&artifact.site_id, &artifact.artifact_id)
    }

    fn cache_key(&self, key: &Key) -> String {
        prefixed_cache_key("artifact", key, Artifact::KEY_FIELDS)
    }
}
