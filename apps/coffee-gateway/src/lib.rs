//! Coffee search gateway: JSON-RPC over HTTP in front of the catalogue search.

pub mod api;
pub mod config;
pub mod state;

use axum::Router;
use axum_helpers::with_common_layers;
use jsonrpc::{KeyedRateLimiter, MethodRouter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::debug;

use state::AppState;

/// How often idle rate-limiter entries are pruned.
pub const LIMITER_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// The full gateway router with the common layers applied.
pub fn app<R: MethodRouter>(state: &AppState<R>, cors: CorsLayer) -> Router {
    with_common_layers(api::routes(state), cors)
}

/// Periodically drop rate-limiter state for keys that have gone quiet.
pub fn spawn_limiter_maintenance(limiter: Arc<KeyedRateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            debug!("Pruned idle rate limiter entries");
        }
    })
}
