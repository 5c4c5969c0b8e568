use sha2::{Digest, Sha256};

/// Salted one-way hash used to look up API keys.
///
/// `hex(sha256(salt || token))`. The same salt must be used when keys are provisioned.
#[derive(Clone)]
pub struct KeyHasher {
    salt: String,
}

impl KeyHasher {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn hash(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(token.as_bytes());
        const_hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHasher").field("salt", &"<redacted>").finish()
    }
}
