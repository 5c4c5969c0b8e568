use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonrpc::{AuthOutcome, Authenticator, Principal};
use std::sync::Arc;
use tracing::{debug, error};

use crate::hashing::KeyHasher;
use crate::models::Credential;
use crate::repository::CredentialStore;

pub const MISSING_KEY: &str = "Missing API key";
pub const INVALID_KEY: &str = "Invalid API key";
pub const INACTIVE_KEY: &str = "API key is inactive";
pub const EXPIRED_KEY: &str = "API key has expired";
pub const AUTH_UNAVAILABLE: &str = "Authentication unavailable";

/// Validates API keys against a [`CredentialStore`].
pub struct ApiKeyAuthenticator<S: CredentialStore> {
    store: Arc<S>,
    hasher: KeyHasher,
}

impl<S: CredentialStore> ApiKeyAuthenticator<S> {
    pub fn new(store: Arc<S>, hasher: KeyHasher) -> Self {
        Self { store, hasher }
    }

    /// Apply the activity and expiry rules to a stored credential.
    pub fn evaluate(credential: Credential, now: DateTime<Utc>) -> AuthOutcome {
        if !credential.is_active {
            debug!(key_id = %credential.id, "Rejected inactive API key");
            return AuthOutcome::invalid(INACTIVE_KEY);
        }
        if credential.is_expired_at(now) {
            debug!(key_id = %credential.id, "Rejected expired API key");
            return AuthOutcome::invalid(EXPIRED_KEY);
        }

        AuthOutcome::Valid(Principal::new(
            credential.id.to_string(),
            credential.permissions,
        ))
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> Authenticator for ApiKeyAuthenticator<S> {
    async fn validate(&self, token: Option<&str>) -> AuthOutcome {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return AuthOutcome::invalid(MISSING_KEY);
        };

        let key_hash = self.hasher.hash(token);
        let hash_prefix = &key_hash[..8];

        match self.store.find_by_hash(&key_hash).await {
            Ok(Some(credential)) => Self::evaluate(credential, Utc::now()),
            Ok(None) => {
                debug!(hash_prefix, "Unknown API key");
                AuthOutcome::invalid(INVALID_KEY)
            }
            Err(e) => {
                error!(hash_prefix, error = %e, "Credential lookup failed");
                AuthOutcome::invalid(AUTH_UNAVAILABLE)
            }
        }
    }
}
