//! Shared data models for the CoastWatch analysis engine.
//!
//! This crate provides Serde-serializable types for:
//! - Camera identity, connection parameters and status
//! - Wave intensity scores and their categorical levels
//! - Crowd scores, levels and person detections
//! - Per-cycle analysis results and persisted records

pub mod analysis;
pub mod camera;
pub mod crowd;
pub mod wave;

pub use analysis::{AnalysisRecord, AnalysisResult};
pub use camera::{
    CameraHandle, CameraHandleError, CameraId, CameraStatus, Credentials, LoopState,
    DEFAULT_CAMERA_PORT,
};
pub use crowd::{BoundingBox, CrowdLevel, CrowdScore, PersonDetection};
pub use wave::{WaveLevel, WaveScore};

/// Round a score to two decimals for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(10.0), 10.0);
    }
}
