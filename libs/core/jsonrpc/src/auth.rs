//! Authentication seam between the pipeline and a credential backend.

use async_trait::async_trait;
use std::collections::HashSet;

/// Permission that grants every other permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// The authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Credential id; used for logs and as the rate-limit key. Never the raw token.
    pub key_id: String,
    pub permissions: HashSet<String>,
}

impl Principal {
    pub fn new<I, S>(key_id: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_id: key_id.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Principal used when authentication is switched off for local development.
    pub fn development() -> Self {
        Self::new("development", [WILDCARD_PERMISSION])
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(WILDCARD_PERMISSION) || self.permissions.contains(permission)
    }
}

/// Result of validating a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Valid(Principal),
    /// `reason` is shown to the client as the error message.
    Invalid { reason: String },
}

impl AuthOutcome {
    pub fn invalid(reason: impl Into<String>) -> Self {
        AuthOutcome::Invalid {
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, AuthOutcome::Valid(_))
    }
}

/// Validates the token carried by a request.
///
/// Implementations are read-only against their credential store and must not log
/// the token itself.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `token` is `None` when the request presented no credential at all.
    async fn validate(&self, token: Option<&str>) -> AuthOutcome;
}
