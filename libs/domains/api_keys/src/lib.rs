//! API-key authentication
//!
//! Keys are provisioned out of band; this crate only reads them. A presented
//! token is hashed with the deployment salt and looked up by hash, so the raw
//! token is never stored or logged.
//!
//! ```text
//! ┌──────────────────────┐
//! │ ApiKeyAuthenticator  │  ← jsonrpc::Authenticator, activity/expiry rules
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │   CredentialStore    │  ← lookup by hash (Postgres or in-memory)
//! └──────────────────────┘
//! ```

pub mod error;
pub mod hashing;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{AuthError, AuthResult};
pub use hashing::KeyHasher;
pub use models::Credential;
pub use postgres::PostgresCredentialStore;
pub use repository::{CredentialStore, InMemoryCredentialStore};
pub use service::ApiKeyAuthenticator;
