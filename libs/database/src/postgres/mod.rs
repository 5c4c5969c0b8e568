//! PostgreSQL pool construction and health checks

mod config;
mod connector;
mod health;

pub use config::PostgresConfig;
pub use connector::{connect_from_config, connect_with_retry};
pub use health::{check_extension, check_health};

pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
