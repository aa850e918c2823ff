//! Per-cycle analysis results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CameraId, CrowdScore, WaveScore};

/// Immutable snapshot produced once per analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub camera_id: CameraId,
    pub timestamp: DateTime<Utc>,
    pub wave: WaveScore,
    pub crowd: CrowdScore,
    /// Width of the analysed frame in pixels
    pub frame_width: u32,
    /// Height of the analysed frame in pixels
    pub frame_height: u32,
    /// Wall-clock time spent scoring, in seconds
    pub processing_time: f64,
}

/// Durable form of an analysis result, as handed to a persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisRecord {
    pub id: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// Location of the saved frame, if one was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_path: Option<String>,
}

impl AnalysisRecord {
    pub fn new(result: AnalysisResult, frame_path: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            result,
            frame_path,
        }
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.result.camera_id
    }
}
