use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::debug;

use crate::common::DatabaseError;

/// `SELECT 1` round trip. Used by the readiness probe.
pub async fn check_health(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    debug!("Running PostgreSQL health check");

    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    db.query_one_raw(stmt).await.map_err(|e| {
        DatabaseError::HealthCheckFailed(format!("PostgreSQL health check failed: {}", e))
    })?;

    Ok(())
}

/// Verify that `extension` (e.g. `vector`) is installed in the connected database.
pub async fn check_extension(db: &DatabaseConnection, extension: &str) -> Result<(), DatabaseError> {
    let stmt = Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "SELECT 1 FROM pg_extension WHERE extname = $1",
        [extension.into()],
    );

    match db.query_one_raw(stmt).await? {
        Some(_) => Ok(()),
        None => Err(DatabaseError::MissingExtension(extension.to_string())),
    }
}
