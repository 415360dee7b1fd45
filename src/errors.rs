//! Unified application error type.
//! All modules (db, core, upstream, cli) return AppError to keep the error
//! handling consistent and easy to manage.

use crate::upstream::UpstreamError;
use serde_json::{Value, json};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ---------------------------
    // Upstream provider
    // ---------------------------
    /// Missing URL, company id or credentials for the upstream provider.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid tenant id: {0}")]
    InvalidTenant(String),

    #[error("Invalid auth method: {0}")]
    InvalidAuthMethod(String),

    // ---------------------------
    // Config file errors
    // ---------------------------
    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// Structured form persisted into `sync_log.errors`.
    pub fn details(&self) -> Value {
        match self {
            AppError::Upstream(e) => json!({
                "message": self.to_string(),
                "details": {
                    "context": e.context,
                    "attempts": e.attempts,
                },
            }),
            _ => json!({ "message": self.to_string() }),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
