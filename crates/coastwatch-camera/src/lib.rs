//! Camera frame sources.
//!
//! This crate provides:
//! - The `FrameSource` contract consumed by the analysis loop
//! - `FrameBuffer`, the single-slot latest-wins frame exchange
//! - `HttpCamera`, an MJPEG stream / snapshot-polling source for HTTP cameras
//! - A multipart MJPEG splitter and retry helpers

pub mod buffer;
pub mod error;
pub mod http;
pub mod metrics;
pub mod mjpeg;
pub mod retry;
pub mod source;

pub use buffer::FrameBuffer;
pub use error::{CameraError, CameraResult};
pub use http::{CaptureMode, HttpCamera, HttpCameraConfig, HttpSourceFactory};
pub use mjpeg::MjpegSplitter;
pub use retry::{retry_async, FailureTracker, RetryConfig};
pub use source::{FrameSource, SourceFactory};
