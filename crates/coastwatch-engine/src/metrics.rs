//! Analysis metrics.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use std::net::SocketAddr;

use crate::error::{EngineError, EngineResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const CYCLES_COMPLETED_TOTAL: &str = "coastwatch_cycles_completed_total";
    pub const CYCLES_FAILED_TOTAL: &str = "coastwatch_cycles_failed_total";
    pub const CYCLE_DURATION_SECONDS: &str = "coastwatch_cycle_duration_seconds";
    pub const FRAME_WAITS_TOTAL: &str = "coastwatch_frame_waits_total";
    pub const SINK_FAILURES_TOTAL: &str = "coastwatch_sink_failures_total";
    pub const ACTIVE_LOOPS: &str = "coastwatch_active_loops";
    pub const WAVE_INTENSITY: &str = "coastwatch_wave_intensity";
    pub const PEOPLE_COUNT: &str = "coastwatch_people_count";
}

/// Install the Prometheus recorder with its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> EngineResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| EngineError::internal(format!("failed to install metrics exporter: {e}")))
}

pub fn record_cycle_completed(camera_id: &str, duration_secs: f64, intensity: f64, people: u32) {
    let labels = [("camera_id", camera_id.to_string())];
    counter!(names::CYCLES_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::CYCLE_DURATION_SECONDS, &labels).record(duration_secs);
    gauge!(names::WAVE_INTENSITY, &labels).set(intensity);
    gauge!(names::PEOPLE_COUNT, &labels).set(people as f64);
}

pub fn record_cycle_failed(camera_id: &str) {
    counter!(names::CYCLES_FAILED_TOTAL, "camera_id" => camera_id.to_string()).increment(1);
}

pub fn record_frame_wait(camera_id: &str) {
    counter!(names::FRAME_WAITS_TOTAL, "camera_id" => camera_id.to_string()).increment(1);
}

pub fn record_sink_failure(sink: &str) {
    counter!(names::SINK_FAILURES_TOTAL, "sink" => sink.to_string()).increment(1);
}

pub fn loop_started() {
    gauge!(names::ACTIVE_LOOPS).increment(1.0);
}

pub fn loop_stopped() {
    gauge!(names::ACTIVE_LOOPS).decrement(1.0);
}
