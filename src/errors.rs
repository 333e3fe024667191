// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MultirunError {
    #[error("failed to read instructions file {path:?}: {source}")]
    ReadInstructions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse instructions file {path:?} as JSON: {source}")]
    ParseInstructions {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("failed to resolve '{path}' (tried: {})", tried.join(", "))]
    Resolution { path: String, tried: Vec<String> },

    #[error("interpreter '{name}' not found: {reason}")]
    InterpreterNotFound { name: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MultirunError>;
