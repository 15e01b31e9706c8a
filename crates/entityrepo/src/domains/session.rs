use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entityrepo_core::repository::{EntityHooks, ValidationResult};
use entityrepo_core::storage::{key_of, Key};

/// A visitor's browsing session at a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub site_id: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub const KEY_FIELDS: &'static [&'static str] = &["sessionId"];

    /// Starts a session that expires after `lifetime`.
    pub fn start(site_id: impl Into<String>, language: impl Into<String>, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            site_id: site_id.into(),
            language: language.into(),
            created_at: now,
            expires_at: now + lifetime,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn key(session_id: &str) -> Key {
        key_of([("sessionId", session_id)])
    }
}

pub struct SessionHooks;

impl EntityHooks for SessionHooks {
    type Entity = Session;

    fn validate_entity(&self, session: &Session) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_non_empty(&session.session_id, "sessionId")
            .require_non_empty(&session.site_id, "siteId")
            .require_non_empty(&session.language, "language")
            .require(
                session.expires_at > session.created_at,
                "expiresAt must be after createdAt",
            );
        result
    }

    fn primary_key(&self, session: &Session) -> Key {
        Session::key(&session.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_sets_expiry() {
        let session = Session::start("louvre", "fr", Duration::hours(2));

        assert_eq!(session.expires_at - session.created_at, Duration::hours(2));
        assert!(!session.is_expired_at(session.created_at));
        assert!(session.is_expired_at(session.expires_at));
    }

    #[test]
    fn test_expiry_must_follow_creation() {
        let session = Session::start("louvre", "fr", Duration::zero());
        let result = SessionHooks.validate_entity(&session);

        assert_eq!(result.errors, vec!["expiresAt must be after createdAt"]);
    }

    #[test]
    fn test_default_cache_key_is_key_json() {
        let key = Session::key("abc");
        assert_eq!(SessionHooks.cache_key(&key), r#"{"sessionId":"abc"}"#);
    }
}
