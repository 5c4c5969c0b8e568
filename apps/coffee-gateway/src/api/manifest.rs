use axum::{Json, Router, extract::State, routing::get};
use jsonrpc::{JSONRPC_VERSION, MethodDescriptor, MethodRouter};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Service description published at `GET /manifest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: &'static str,
    pub version: &'static str,
    pub protocol_version: &'static str,
    pub endpoint: String,
    pub methods: Vec<MethodDescriptor>,
}

async fn manifest_handler(State(manifest): State<Arc<Manifest>>) -> Json<Manifest> {
    Json(manifest.as_ref().clone())
}

pub fn router<R: MethodRouter>(state: &AppState<R>) -> Router {
    let manifest = Manifest {
        name: state.app.name,
        version: state.app.version,
        protocol_version: JSONRPC_VERSION,
        endpoint: state.rpc_path.clone(),
        methods: state.rpc.router().methods().to_vec(),
    };

    Router::new()
        .route("/manifest", get(manifest_handler))
        .with_state(Arc::new(manifest))
}
