//! People-detector capability.

use coastwatch_models::PersonDetection;

use crate::error::DetectorError;
use crate::frame::Frame;

/// Opaque bounding-box detector.
///
/// Implementations return raw detections (any class, any confidence);
/// filtering is left to [`crate::CrowdScorer`]. Detection runs on a
/// blocking thread, so implementations may be CPU-heavy.
pub trait PeopleDetector: Send + Sync {
    /// Detect objects in a frame.
    fn detect(&self, frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError>;

    /// Whether a model is loaded and usable.
    fn is_available(&self) -> bool {
        true
    }

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Detector used when no model could be loaded.
#[derive(Debug, Clone)]
pub struct UnavailableDetector {
    reason: String,
}

impl UnavailableDetector {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Default for UnavailableDetector {
    fn default() -> Self {
        Self::new("no detection model configured")
    }
}

impl PeopleDetector for UnavailableDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError> {
        Err(DetectorError::unavailable(self.reason.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
