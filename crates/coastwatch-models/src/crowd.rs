//! Crowd scores, levels and person detections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel-space bounding box (top-left corner plus size).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
    }

    pub fn x2(&self) -> f32 {
        self.x + self.width
    }

    pub fn y2(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// One detector hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersonDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    /// Detector class id (0 = person)
    pub class_id: usize,
}

impl PersonDetection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_id: usize) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }

    /// Person detection (class 0).
    pub fn person(bbox: BoundingBox, confidence: f32) -> Self {
        Self::new(bbox, confidence, 0)
    }

    pub fn is_person(&self) -> bool {
        self.class_id == 0
    }
}

/// Crowd density bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CrowdLevel {
    Empty,
    Sparse,
    Moderate,
    Crowded,
    VeryCrowded,
    /// Detector unavailable
    Unknown,
    /// Detector failed on this frame
    Error,
}

impl CrowdLevel {
    /// Bucket a 0-10 crowd score.
    pub fn from_score(score: f64) -> Self {
        if score < 2.0 {
            CrowdLevel::Empty
        } else if score < 4.0 {
            CrowdLevel::Sparse
        } else if score < 6.0 {
            CrowdLevel::Moderate
        } else if score < 8.0 {
            CrowdLevel::Crowded
        } else {
            CrowdLevel::VeryCrowded
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CrowdLevel::Empty => "Empty",
            CrowdLevel::Sparse => "Sparse",
            CrowdLevel::Moderate => "Moderate",
            CrowdLevel::Crowded => "Crowded",
            CrowdLevel::VeryCrowded => "Very crowded",
            CrowdLevel::Unknown => "unknown",
            CrowdLevel::Error => "error",
        }
    }

    /// Human description for a given head count.
    pub fn describe(&self, people_count: u32) -> String {
        match self {
            CrowdLevel::Empty => "Nobody visible, safe".to_string(),
            CrowdLevel::Sparse => format!("{people_count} people, comfortable"),
            CrowdLevel::Moderate => format!("{people_count} people, normal crowd"),
            CrowdLevel::Crowded => format!("{people_count} people, be careful"),
            CrowdLevel::VeryCrowded => format!("{people_count} people, very crowded"),
            CrowdLevel::Unknown => "People detection unavailable".to_string(),
            CrowdLevel::Error => "People detection failed".to_string(),
        }
    }

    /// Whether the level came from a real detector run.
    pub fn is_measured(&self) -> bool {
        !matches!(self, CrowdLevel::Unknown | CrowdLevel::Error)
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Crowd assessment of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrowdScore {
    pub people_count: u32,
    pub level: CrowdLevel,
    /// 0-10, rounded to two decimals
    pub score: f64,
    /// Frame pixels per detected person; diagnostic only
    pub area_per_person: u64,
    /// Accepted detections, kept for visualisation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detections: Vec<PersonDetection>,
}

impl CrowdScore {
    /// Sentinel used when the detector is unavailable.
    pub fn unknown() -> Self {
        Self::sentinel(CrowdLevel::Unknown)
    }

    /// Sentinel used when the detector failed on the frame.
    pub fn failed() -> Self {
        Self::sentinel(CrowdLevel::Error)
    }

    fn sentinel(level: CrowdLevel) -> Self {
        Self {
            people_count: 0,
            level,
            score: 0.0,
            area_per_person: 0,
            detections: Vec::new(),
        }
    }

    pub fn description(&self) -> String {
        self.level.describe(self.people_count)
    }
}
