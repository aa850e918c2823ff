//! Error types for frame analysis.

use thiserror::Error;

/// Result type for frame analysis.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while decoding or scoring a frame.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Frame has zero area ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Frame decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid scorer configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisionError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Errors reported by a people detector.
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    /// The model could not be loaded; crowd scoring degrades to unknown.
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    #[error("Detection failed: {0}")]
    Inference(String),
}

impl DetectorError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, DetectorError::Unavailable(_))
    }
}
