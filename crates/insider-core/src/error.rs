//! Error types for the insider monitor.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },

    #[error("Invalid trade data: {0}")]
    InvalidTrade(String),

    #[error("Alert delivery failed: {0}")]
    AlertDelivery(String),

    #[error("Operation cancelled by shutdown signal")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
