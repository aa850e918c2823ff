//! Frame pump metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Frames decoded and published, by camera and mode.
    pub const FRAMES_DECODED_TOTAL: &str = "coastwatch_frames_decoded_total";

    /// Frames skipped because they could not be fetched or decoded.
    pub const FRAMES_DROPPED_TOTAL: &str = "coastwatch_frames_dropped_total";

    /// Stream reconnect attempts.
    pub const RECONNECTS_TOTAL: &str = "coastwatch_camera_reconnects_total";
}

pub fn record_frame_decoded(camera_id: &str, mode: &'static str) {
    counter!(
        names::FRAMES_DECODED_TOTAL,
        "camera_id" => camera_id.to_string(),
        "mode" => mode
    )
    .increment(1);
}

pub fn record_frame_dropped(camera_id: &str, mode: &'static str) {
    counter!(
        names::FRAMES_DROPPED_TOTAL,
        "camera_id" => camera_id.to_string(),
        "mode" => mode
    )
    .increment(1);
}

pub fn record_reconnect(camera_id: &str) {
    counter!(names::RECONNECTS_TOTAL, "camera_id" => camera_id.to_string()).increment(1);
}
