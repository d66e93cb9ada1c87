//! Error definitions shared across the engine.

use std::path::PathBuf;

use thiserror::Error;

/// Engine error types
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("A conversion job is already running")]
    JobAlreadyRunning,

    #[error(transparent)]
    Encode(#[from] crate::codec::EncodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine result type
pub type ConvertResult<T> = Result<T, ConvertError>;
