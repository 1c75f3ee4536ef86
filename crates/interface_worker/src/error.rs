//! Worker error handling

use std::path::PathBuf;
use thiserror::Error;

use infra_db::DatabaseError;

/// Worker error types
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Cannot read job file {path}: {source}")]
    JobRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid job file {path}: {message}")]
    JobFormat { path: PathBuf, message: String },

    #[error("Outbox unavailable at {path}: {source}")]
    Outbox {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
