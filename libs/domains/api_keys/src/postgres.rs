use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbBackend, FromQueryResult, Statement};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AuthResult;
use crate::models::Credential;
use crate::repository::CredentialStore;

/// Credential store backed by the `api_keys` table.
#[derive(Clone)]
pub struct PostgresCredentialStore {
    db: Arc<DatabaseConnection>,
}

impl PostgresCredentialStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct CredentialRow {
    id: Uuid,
    name: String,
    key_hash: String,
    permissions: Vec<String>, // PostgreSQL text array
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Credential {
            id: row.id,
            name: row.name,
            key_hash: row.key_hash,
            permissions: row.permissions.into_iter().collect(),
            is_active: row.is_active,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_hash(&self, key_hash: &str) -> AuthResult<Option<Credential>> {
        let sql = r#"
            SELECT id, name, key_hash, permissions, is_active, expires_at, created_at
            FROM api_keys
            WHERE key_hash = $1
        "#;

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [key_hash.into()]);

        let row = CredentialRow::find_by_statement(stmt)
            .one(self.db.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }
}
