use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entityrepo_core::cache::prefixed_cache_key;
use entityrepo_core::repository::{EntityHooks, ValidationResult};
use entityrepo_core::storage::{key_of, Key};

/// A visitable site (museum, park, monument) offering content in one or
/// more languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub site_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Language codes the site offers content in.
    pub languages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Site {
    pub const KEY_FIELDS: &'static [&'static str] = &["siteId"];

    /// Creates a new site with a random ID.
    pub fn new(name: impl Into<String>, languages: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            site_id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            languages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description for this site.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets a specific ID for this site.
    pub fn with_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = site_id.into();
        self
    }

    pub fn key(site_id: &str) -> Key {
        key_of([("siteId", site_id)])
    }
}

pub struct SiteHooks;

impl EntityHooks for SiteHooks {
    type Entity = Site;

    fn validate_entity(&self, site: &Site) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_non_empty(&site.site_id, "siteId")
            .require_non_empty(&site.name, "name")
            .require(
                !site.languages.is_empty(),
                "languages must contain at least one language",
            )
            .require(
                site.languages.iter().all(|l| !l.trim().is_empty()),
                "languages must not contain empty codes",
            );
        result
    }

    fn primary_key(&self, site: &Site) -> Key {
        Site::key(&site.site_id)
    }

    fn cache_key(&self, key: &Key) -> String {
        prefixed_cache_key("site", key, Site::KEY_FIELDS)
    }
}
