use axum_helpers::serve_with_shutdown;
use coffee_gateway::config::{Config, cors_layer};
use coffee_gateway::state::AppState;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::RetryConfig;
use database::postgres::{check_extension, connect_with_retry};
use domain_api_keys::{ApiKeyAuthenticator, KeyHasher, PostgresCredentialStore};
use domain_coffee::{
    CoffeeMethodRouter, EmbeddingProvider, OpenAIProvider, PostgresCoffeeRepository,
    SearchOrchestrator,
};
use jsonrpc::{Authenticator, RpcState};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let db = connect_with_retry(
        config.database.clone(),
        RetryConfig::new().with_max_retries(5),
    )
    .await
    .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;
    let db = Arc::new(db);

    if let Err(e) = check_extension(&db, "vector").await {
        warn!(error = %e, "pgvector check failed; flavor search will degrade to tag matching");
    }

    let embedder: Option<Arc<dyn EmbeddingProvider>> = match config.embedding.clone() {
        Some(embedding) => {
            info!(model = %embedding.model, "Embedding provider configured");
            Some(Arc::new(OpenAIProvider::new(embedding)))
        }
        None => {
            warn!("OPENAI_API_KEY not set; flavor search will use tag matching only");
            None
        }
    };

    let repository = Arc::new(PostgresCoffeeRepository::new(db.clone()));
    let orchestrator = Arc::new(SearchOrchestrator::new(
        repository,
        embedder,
        config.search.clone(),
    ));
    let methods = Arc::new(CoffeeMethodRouter::new(orchestrator));

    // Dev mode never consults the authenticator, so a missing salt is harmless there.
    let salt = config.gateway.api_key_salt.clone().unwrap_or_default();
    let authenticator: Arc<dyn Authenticator> = Arc::new(ApiKeyAuthenticator::new(
        Arc::new(PostgresCredentialStore::new(db.clone())),
        KeyHasher::new(salt),
    ));

    let rpc = RpcState::new(methods, authenticator, config.rpc_settings());
    let maintenance = rpc
        .rate_limiter()
        .cloned()
        .map(coffee_gateway::spawn_limiter_maintenance);

    let state = AppState {
        app: config.app,
        rpc_path: config.gateway.rpc_path.clone(),
        rpc,
        db: db.clone(),
    };

    let cors = cors_layer(&config.gateway, config.environment)?;
    let router = coffee_gateway::app(&state, cors);
    drop(state);

    info!(
        rpc_path = %config.gateway.rpc_path,
        dev_mode = config.gateway.dev_mode,
        "Starting coffee gateway"
    );

    serve_with_shutdown(router, &config.server, async move {
        if let Some(task) = maintenance {
            task.abort();
        }

        info!("Shutting down: closing database connections");
        match Arc::try_unwrap(db) {
            Ok(db) => match db.close().await {
                Ok(_) => info!("PostgreSQL connection closed successfully"),
                Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
            },
            Err(_) => warn!("PostgreSQL pool still shared at shutdown; dropping it"),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Coffee gateway shutdown complete");
    Ok(())
}
