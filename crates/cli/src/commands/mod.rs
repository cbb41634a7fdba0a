//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod token;

use thiserror::Error;

use order_tracker_server::config::ConfigError;
use order_tracker_server::services::{AuthError, TrackingError};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Token error: {0}")]
    Token(#[from] AuthError),

    #[error("Order error: {0}")]
    Tracking(#[from] TrackingError),
}

/// Database URL from `TRACKER_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) fn database_url() -> Result<secrecy::SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("TRACKER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(secrecy::SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TRACKER_DATABASE_URL"))
}
