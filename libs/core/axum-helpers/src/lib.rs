//! # Axum Helpers
//!
//! Shared building blocks for the Axum services in this workspace.
//!
//! - **[`server`]**: common layers, health endpoints, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: transport-level error responses
//!
//! ```ignore
//! use axum_helpers::{create_cors_layer, health_router, serve_with_shutdown, with_common_layers};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let router = with_common_layers(routes.merge(health_router(app_info!())), cors);
//! serve_with_shutdown(router, &ServerConfig::default(), async {}).await?;
//! ```

pub mod errors;
pub mod http;
pub mod server;

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, health_router, run_health_checks,
    serve_with_shutdown, shutdown_signal, with_common_layers,
};

pub use http::{
    create_cors_layer, create_permissive_cors_layer, parse_allowed_origins, security_headers,
};

pub use errors::{AppError, ErrorResponse};
