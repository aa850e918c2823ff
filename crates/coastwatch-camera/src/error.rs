//! Camera error types.

use thiserror::Error;

use coastwatch_models::CameraHandleError;

/// Result type for camera operations.
pub type CameraResult<T> = Result<T, CameraError>;

/// Errors that can occur while talking to a camera.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera unreachable at {address}: {message}")]
    Unreachable { address: String, message: String },

    #[error("Camera returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Camera request timed out: {0}")]
    Timeout(String),

    #[error("Invalid camera handle: {0}")]
    InvalidHandle(#[from] CameraHandleError),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CameraError {
    pub fn unreachable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Classify a transport failure against `address`.
    pub fn from_transport(address: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{address}: {err}"))
        } else if err.is_connect() {
            Self::unreachable(address, err.to_string())
        } else {
            Self::Network(err)
        }
    }

    /// Camera could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            CameraError::Unreachable { .. } | CameraError::Timeout(_) | CameraError::Network(_)
        )
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            CameraError::Unreachable { .. } | CameraError::Timeout(_) | CameraError::Network(_) => {
                true
            }
            CameraError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
