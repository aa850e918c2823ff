//! Frame scoring for sea-state and crowd assessment.
//!
//! This crate provides:
//! - `Frame`, the decoded image unit exchanged between camera and engine
//! - Wave intensity scoring (motion, edge and frequency-pattern fusion with
//!   a rolling intensity history)
//! - Crowd scoring from people-detector output
//! - The `PeopleDetector` capability and an ONNX YOLOv8 implementation
//!   behind the `onnx` feature
//! - Detection overlays for saved frames

pub mod crowd;
pub mod detector;
pub mod error;
pub mod frame;
pub mod history;
pub mod overlay;
pub mod spectrum;
pub mod wave;
#[cfg(feature = "onnx")]
pub mod yolo;

pub use crowd::{crowd_score_for_count, CrowdScorer, DEFAULT_CONFIDENCE_THRESHOLD, PERSON_CLASS_ID};
pub use detector::{PeopleDetector, UnavailableDetector};
pub use error::{DetectorError, VisionError, VisionResult};
pub use frame::Frame;
pub use history::IntensityHistory;
pub use overlay::annotate_detections;
pub use spectrum::SpectrumAnalyzer;
pub use wave::{WaveIntensityScorer, WaveScorerConfig};
#[cfg(feature = "onnx")]
pub use yolo::{YoloPersonDetector, YoloConfig};
