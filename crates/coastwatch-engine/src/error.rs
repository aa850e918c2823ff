//! Engine error types.

use thiserror::Error;

use coastwatch_camera::CameraError;
use coastwatch_models::{CameraHandleError, CameraId};
use coastwatch_storage::StorageError;
use coastwatch_vision::VisionError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Camera not registered: {0}")]
    CameraNotFound(CameraId),

    #[error("Camera already registered: {0}")]
    AlreadyRegistered(CameraId),

    #[error("Invalid camera handle: {0}")]
    InvalidHandle(#[from] CameraHandleError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] VisionError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Persistence timed out after {0:?}")]
    SinkTimeout(std::time::Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Camera could not be reached; non-fatal, the camera stays registered.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, EngineError::Camera(e) if e.is_connectivity())
    }

    /// Worth retrying later without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Camera(e) => e.is_retryable(),
            EngineError::SinkTimeout(_) => true,
            EngineError::Storage(StorageError::Io(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        let err: EngineError = CameraError::unreachable("10.0.0.9:80", "refused").into();
        assert!(err.is_connectivity());
        assert!(err.is_retryable());

        let err = EngineError::CameraNotFound(CameraId::new("x"));
        assert!(!err.is_connectivity());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Camera not registered: x");
    }
}
