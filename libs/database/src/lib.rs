//! PostgreSQL connectivity shared by the domain crates.
//!
//! - [`postgres`]: pool construction from [`postgres::PostgresConfig`], health checks
//! - [`common`]: the unified [`common::DatabaseError`] and retry-with-backoff helpers
//!
//! # Example
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::common::RetryConfig;
//! use database::postgres::{self, PostgresConfig};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = postgres::connect_with_retry(config, RetryConfig::default()).await?;
//! postgres::check_health(&db).await?;
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryConfig, retry_with_backoff};
pub use sea_orm::DatabaseConnection;
