//! Server infrastructure: shared layers, health endpoints and graceful shutdown.
//!
//! ```ignore
//! use axum_helpers::server::{health_router, serve_with_shutdown, with_common_layers};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let app = with_common_layers(api_routes.merge(health_router(app_info!())), cors);
//! serve_with_shutdown(app, &ServerConfig::default(), async {}).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{serve_with_shutdown, with_common_layers};
pub use health::{HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
