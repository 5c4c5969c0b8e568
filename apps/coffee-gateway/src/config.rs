use axum_helpers::{create_cors_layer, create_permissive_cors_layer, parse_allowed_origins};
use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_flag, env_optional, env_or_default, env_parse,
    server::ServerConfig,
};
use database::postgres::PostgresConfig;
use domain_coffee::{OpenAIConfig, SearchConfig};
use jsonrpc::RpcSettings;
use tower_http::cors::CorsLayer;

pub use core_config::Environment;

/// RPC endpoint, authentication and CORS settings.
#[derive(Clone)]
pub struct GatewayConfig {
    pub rpc_path: String,
    /// Authentication is skipped entirely; refused in production
    pub dev_mode: bool,
    /// Salt for API key hashes; always present outside dev mode
    pub api_key_salt: Option<String>,
    /// Requests per minute per key; 0 disables limiting
    pub rate_limit_per_minute: u32,
    pub cors_allowed_origins: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("rpc_path", &self.rpc_path)
            .field("dev_mode", &self.dev_mode)
            .field("api_key_salt", &self.api_key_salt.as_ref().map(|_| "[REDACTED]"))
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl FromEnv for GatewayConfig {
    /// - `RPC_PATH`: defaults to `/rpc`
    /// - `AUTH_DEV_MODE`: defaults to false
    /// - `API_KEY_SALT`: required unless dev mode
    /// - `RATE_LIMIT_PER_MINUTE`: defaults to 60
    /// - `CORS_ALLOWED_ORIGIN`: comma-separated; unset means permissive in development
    fn from_env() -> Result<Self, ConfigError> {
        let rpc_path = env_or_default("RPC_PATH", "/rpc");
        if !rpc_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "RPC_PATH".to_string(),
                details: "must start with '/'".to_string(),
            });
        }

        let dev_mode = env_flag("AUTH_DEV_MODE", false)?;
        let api_key_salt = env_optional("API_KEY_SALT");
        if !dev_mode && api_key_salt.is_none() {
            return Err(ConfigError::MissingEnvVar("API_KEY_SALT".to_string()));
        }

        Ok(Self {
            rpc_path,
            dev_mode,
            api_key_salt,
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", 60u32)?,
            cors_allowed_origins: env_optional("CORS_ALLOWED_ORIGIN"),
        })
    }
}

/// Everything the gateway reads from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub gateway: GatewayConfig,
    pub search: SearchConfig,
    pub embedding: Option<OpenAIConfig>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let gateway = GatewayConfig::from_env()?;

        if gateway.dev_mode && environment.is_production() {
            return Err(ConfigError::Invalid {
                key: "AUTH_DEV_MODE".to_string(),
                details: "cannot be enabled when APP_ENV=production".to_string(),
            }
            .into());
        }

        Ok(Self {
            app: app_info!(),
            environment,
            server: ServerConfig::from_env()?,
            database: PostgresConfig::from_env()?,
            gateway,
            search: SearchConfig::from_env()?,
            embedding: OpenAIConfig::from_env()?,
        })
    }

    pub fn rpc_settings(&self) -> RpcSettings {
        RpcSettings {
            dev_mode: self.gateway.dev_mode,
            request_timeout: self.server.request_timeout,
            rate_limit_per_minute: self.gateway.rate_limit_per_minute,
        }
    }
}

/// Configured origins, or any origin in development when none are configured.
///
/// Production without `CORS_ALLOWED_ORIGIN` allows no cross-origin callers.
pub fn cors_layer(gateway: &GatewayConfig, environment: Environment) -> std::io::Result<CorsLayer> {
    match &gateway.cors_allowed_origins {
        Some(raw) => Ok(create_cors_layer(parse_allowed_origins(raw)?)),
        None if environment.is_development() => Ok(create_permissive_cors_layer()),
        None => Ok(create_cors_layer(Vec::new())),
    }
}
