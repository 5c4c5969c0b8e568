//! Readiness probe with real database checks.

use axum::{Router, extract::State, response::Response, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use database::DatabaseConnection;
use database::postgres::{check_extension, check_health};
use std::sync::Arc;

/// Ready when Postgres answers and the `vector` extension is installed.
pub async fn ready_handler(State(db): State<Arc<DatabaseConnection>>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![
        (
            "database",
            Box::pin(async { check_health(&db).await.map_err(|e| e.to_string()) }),
        ),
        (
            "vector",
            Box::pin(async {
                check_extension(&db, "vector")
                    .await
                    .map_err(|e| e.to_string())
            }),
        ),
    ];

    run_health_checks(checks).await
}

pub fn ready_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/ready", get(ready_handler))
        .with_state(db)
}
