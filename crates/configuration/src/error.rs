//! Errors that can occur while reading, writing and interpreting a configuration.

use std::path::PathBuf;

use thiserror::Error;

use query_engine_metadata::metadata::ValidationError;

use crate::environment;

/// The configuration file could not be read.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The configuration could not be written.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("could not serialize the configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The configuration could not be turned into a runtime configuration.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid configuration at {path}: {error}")]
    Secret {
        path: String,
        error: environment::Error,
    },
    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] ValidationError),
}
