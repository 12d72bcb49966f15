//! Typed errors for mix generation.
//!
//! Uses `thiserror` for ergonomic error definitions and implements
//! `Serialize` so errors can cross a UI boundary cleanly.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum MixError {
    /// A source the mix cannot run without has no catalog link yet
    #[error("'{label}' is not linked yet. Link it in settings (slot '{slot}') and try again")]
    Unlinked { slot: String, label: String },

    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// Every source came back empty after filtering
    #[error("Could not build a mix: {0}")]
    Exhausted(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for MixError {
    fn from(e: sqlx::Error) -> Self {
        MixError::Database(e.to_string())
    }
}

impl From<anyhow::Error> for MixError {
    fn from(e: anyhow::Error) -> Self {
        MixError::Catalog(format!("{:#}", e))
    }
}

impl From<serde_json::Error> for MixError {
    fn from(e: serde_json::Error) -> Self {
        MixError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<std::io::Error> for MixError {
    fn from(e: std::io::Error) -> Self {
        MixError::Config(e.to_string())
    }
}

pub type MixResult<T> = Result<T, MixError>;
