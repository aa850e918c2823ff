//! Storage error types.

use thiserror::Error;

use coastwatch_vision::VisionError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while persisting results or frames.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame encoding failed: {0}")]
    Encode(#[from] VisionError),

    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }
}
