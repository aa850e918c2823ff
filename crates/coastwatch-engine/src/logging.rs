//! Structured per-camera logging.
//!
//! Every analysis loop carries a `CameraLogger` so that lifecycle events
//! share the same `camera_id` and `operation` fields, and its span wraps
//! the loop task.

use tracing::{error, info, warn, Span};

use coastwatch_models::{AnalysisResult, CameraId};

#[derive(Debug, Clone)]
pub struct CameraLogger {
    camera_id: String,
    operation: String,
}

impl CameraLogger {
    pub fn new(camera_id: &CameraId, operation: &str) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            camera_id = %self.camera_id,
            operation = %self.operation,
            "Analysis started: {}", message
        );
    }

    /// One completed cycle.
    pub fn log_cycle(&self, result: &AnalysisResult) {
        info!(
            camera_id = %self.camera_id,
            operation = %self.operation,
            wave_intensity = result.wave.current_intensity,
            wave_average = result.wave.average_intensity,
            wave_level = result.wave.level.name(),
            people = result.crowd.people_count,
            crowd_level = result.crowd.level.name(),
            processing_ms = (result.processing_time * 1000.0).round() as u64,
            "Analysis cycle completed"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            camera_id = %self.camera_id,
            operation = %self.operation,
            "Analysis warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            camera_id = %self.camera_id,
            operation = %self.operation,
            "Analysis error: {}", message
        );
    }

    pub fn log_stop(&self, cycles: u64, failures: u64) {
        info!(
            camera_id = %self.camera_id,
            operation = %self.operation,
            cycles,
            failures,
            "Analysis stopped"
        );
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span to instrument the loop task with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "camera",
            camera_id = %self.camera_id,
            operation = %self.operation
        )
    }
}
