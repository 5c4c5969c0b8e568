use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AuthResult;
use crate::models::Credential;

/// Read-only access to provisioned credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the credential whose stored hash equals `key_hash`.
    async fn find_by_hash(&self, key_hash: &str) -> AuthResult<Option<Credential>>;
}

/// In-memory store for development and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    credentials: Arc<RwLock<HashMap<String, Credential>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a credential. Replaces any credential with the same hash.
    pub async fn insert(&self, credential: Credential) {
        self.credentials
            .write()
            .await
            .insert(credential.key_hash.clone(), credential);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_hash(&self, key_hash: &str) -> AuthResult<Option<Credential>> {
        Ok(self.credentials.read().await.get(key_hash).cloned())
    }
}
