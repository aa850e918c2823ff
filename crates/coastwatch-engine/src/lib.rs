//! Continuous multi-camera analysis engine.
//!
//! This crate provides:
//! - `AnalysisSupervisor`, the camera registry and loop lifecycle owner
//! - `PerCameraAnalysisLoop`, the fixed-cadence score-and-publish loop
//! - An in-memory result cache with bounded per-camera history
//! - Environment configuration, structured logging and metrics

pub mod analysis_loop;
pub mod cache;
pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod supervisor;

pub use analysis_loop::{
    CameraAnalyzer, LoopConfig, LoopHandle, LoopStats, PerCameraAnalysisLoop, ResultPublisher,
};
pub use cache::ResultCache;
pub use config::{CameraSettings, EngineConfig};
pub use detection::build_detector;
pub use error::{EngineError, EngineResult};
pub use logging::CameraLogger;
pub use supervisor::{AnalysisSupervisor, Registration};
