use axum::Router;
use axum_helpers::health_router;
use jsonrpc::MethodRouter;

use crate::state::AppState;

pub mod health;
pub mod manifest;

/// All gateway routes, without the common layers.
///
/// - `POST {rpc_path}`: JSON-RPC endpoint
/// - `GET /health`: liveness
/// - `GET /ready`: database readiness
/// - `GET /manifest`: service description and method table
pub fn routes<R: MethodRouter>(state: &AppState<R>) -> Router {
    Router::new()
        .merge(jsonrpc::rpc_routes(&state.rpc_path, state.rpc.clone()))
        .merge(manifest::router(state))
        .merge(health::ready_router(state.db.clone()))
        .merge(health_router(state.app))
}
