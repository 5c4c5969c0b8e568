use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// A provisioned API key, as stored. Only the salted hash of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub permissions: HashSet<String>,
    pub is_active: bool,
    /// `None` never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// An active, non-expiring credential.
    pub fn new<I, S>(name: impl Into<String>, key_hash: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            key_hash: key_hash.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            is_active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
