//! Shared application state.

use core_config::AppInfo;
use database::DatabaseConnection;
use jsonrpc::{MethodRouter, RpcState};
use std::sync::Arc;

/// Cloned into every handler; all fields are cheap `Arc` clones.
pub struct AppState<R: MethodRouter> {
    pub app: AppInfo,
    pub rpc_path: String,
    /// RPC pipeline: authenticator, rate limiter and method table
    pub rpc: RpcState<R>,
    /// PostgreSQL pool, probed by `/ready`
    pub db: Arc<DatabaseConnection>,
}

impl<R: MethodRouter> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            app: self.app,
            rpc_path: self.rpc_path.clone(),
            rpc: self.rpc.clone(),
            db: self.db.clone(),
        }
    }
}
