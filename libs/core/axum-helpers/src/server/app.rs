use super::shutdown::{ShutdownCoordinator, shutdown_signal};
use crate::errors::handlers::{handle_panic, not_found};
use crate::http::security::security_headers;
use axum::{Router, middleware};
use core_config::server::ServerConfig;
use std::future::Future;
use std::io;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

/// Wraps a router with the cross-cutting layers every service shares.
///
/// - 404 fallback with the standard error body
/// - Panic capture (500, payload logged, never returned)
/// - Request tracing spans
/// - Security headers
/// - CORS
///
/// Response compression is deliberately absent: it would hold back server-sent events.
pub fn with_common_layers(router: Router, cors: CorsLayer) -> Router {
    router
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
}

/// Serves `router` until SIGINT/SIGTERM, then drains connections and runs `cleanup`.
///
/// The cleanup future (closing database pools and similar) is bounded by
/// `server_config.shutdown_timeout`; if it overruns, shutdown proceeds anyway.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails while running.
///
/// # Example
/// ```ignore
/// let cleanup = async move {
///     db.close().await.ok();
/// };
/// serve_with_shutdown(router, &config, cleanup).await?;
/// ```
pub async fn serve_with_shutdown<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let coordinator = ShutdownCoordinator::new();

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let signal_handle = coordinator.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_handle.shutdown();
    });

    let drain = coordinator.clone();
    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { drain.wait().await })
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        });

    let shutdown_timeout = server_config.shutdown_timeout;
    info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, cleanup).await {
        Ok(()) => info!("Cleanup completed successfully"),
        Err(_) => warn!(
            "Cleanup exceeded timeout of {:?}, forcing shutdown",
            shutdown_timeout
        ),
    }

    serve_result
}
