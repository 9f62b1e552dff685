//! Error types for the history crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// The configured backend could not be set up.
    #[error("failed to initialize command history: {0}")]
    InitializationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
