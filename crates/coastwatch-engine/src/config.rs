//! Engine configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use coastwatch_camera::{CaptureMode, HttpCameraConfig};
use coastwatch_vision::{WaveScorerConfig, DEFAULT_CONFIDENCE_THRESHOLD};

use crate::error::{EngineError, EngineResult};

/// Camera transport settings.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Timeout for snapshot, control and stream-header requests
    pub timeout: Duration,
    /// Retries for snapshot captures
    pub retry_count: u32,
    /// Timeout for reachability probes
    pub probe_timeout: Duration,
    pub mode: CaptureMode,
    /// Poll period in snapshot mode
    pub snapshot_interval: Duration,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_count: 3,
            probe_timeout: Duration::from_secs(5),
            mode: CaptureMode::Stream,
            snapshot_interval: Duration::from_millis(1000),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sleep between analysis cycles
    pub analysis_interval: Duration,
    /// Poll backoff while a camera has no frame yet
    pub frame_wait_backoff: Duration,
    /// Intensities kept for the rolling wave average
    pub history_window: usize,
    /// Results kept in memory per camera
    pub result_history_capacity: usize,
    /// Bounded join per loop on stop/shutdown
    pub shutdown_timeout: Duration,
    /// Upper bound for one persistence hand-off (frame save plus sink
    /// append together) and for sink lookups made by `status`
    pub sink_timeout: Duration,
    pub save_frames: bool,
    pub frames_dir: PathBuf,
    pub annotate_saved_frames: bool,
    /// Minimum person-detection confidence
    pub detection_confidence: f32,
    pub yolo_model_path: Option<String>,
    pub camera: CameraSettings,
    /// JSON-lines file receiving every analysis record
    pub analysis_log_path: PathBuf,
    /// JSON list of cameras to register at startup
    pub cameras_file: Option<PathBuf>,
    pub metrics_enabled: bool,
    pub metrics_addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_interval: Duration::from_secs(5),
            frame_wait_backoff: Duration::from_millis(1000),
            history_window: 30,
            result_history_capacity: 100,
            shutdown_timeout: Duration::from_secs(10),
            sink_timeout: Duration::from_secs(5),
            save_frames: true,
            frames_dir: PathBuf::from("saved_frames"),
            annotate_saved_frames: false,
            detection_confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            yolo_model_path: None,
            camera: CameraSettings::default(),
            analysis_log_path: PathBuf::from("data/analyses.jsonl"),
            cameras_file: None,
            metrics_enabled: false,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults;
    /// set but unparsable keys are rejected.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = Lookup(&lookup);

        let config = Self {
            analysis_interval: Duration::from_secs(
                env.parse("ANALYSIS_INTERVAL_SECS", defaults.analysis_interval.as_secs())?,
            ),
            frame_wait_backoff: Duration::from_millis(env.parse(
                "FRAME_WAIT_BACKOFF_MS",
                defaults.frame_wait_backoff.as_millis() as u64,
            )?),
            history_window: env.parse("HISTORY_WINDOW", defaults.history_window)?,
            result_history_capacity: env
                .parse("RESULT_HISTORY_CAPACITY", defaults.result_history_capacity)?,
            shutdown_timeout: Duration::from_secs(
                env.parse("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout.as_secs())?,
            ),
            sink_timeout: Duration::from_secs(
                env.parse("SINK_TIMEOUT_SECS", defaults.sink_timeout.as_secs())?,
            ),
            save_frames: env.flag("SAVE_FRAMES", defaults.save_frames)?,
            frames_dir: env.string("FRAMES_DIR").map(PathBuf::from).unwrap_or(defaults.frames_dir),
            annotate_saved_frames: env
                .flag("ANNOTATE_SAVED_FRAMES", defaults.annotate_saved_frames)?,
            detection_confidence: env
                .parse("DETECTION_CONFIDENCE", defaults.detection_confidence)?,
            yolo_model_path: env.string("YOLO_MODEL_PATH"),
            camera: CameraSettings {
                timeout: Duration::from_secs(
                    env.parse("CAMERA_TIMEOUT_SECS", defaults.camera.timeout.as_secs())?,
                ),
                retry_count: env.parse("CAMERA_RETRY_COUNT", defaults.camera.retry_count)?,
                probe_timeout: Duration::from_secs(env.parse(
                    "CAMERA_PROBE_TIMEOUT_SECS",
                    defaults.camera.probe_timeout.as_secs(),
                )?),
                mode: env.parse("CAMERA_MODE", defaults.camera.mode)?,
                snapshot_interval: Duration::from_millis(env.parse(
                    "SNAPSHOT_INTERVAL_MS",
                    defaults.camera.snapshot_interval.as_millis() as u64,
                )?),
            },
            analysis_log_path: env
                .string("ANALYSIS_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.analysis_log_path),
            cameras_file: env.string("CAMERAS_FILE").map(PathBuf::from),
            metrics_enabled: env.flag("METRICS_ENABLED", defaults.metrics_enabled)?,
            metrics_addr: env.parse("METRICS_ADDR", defaults.metrics_addr)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.analysis_interval.is_zero() {
            return Err(EngineError::config_error("ANALYSIS_INTERVAL_SECS must be positive"));
        }
        if self.history_window == 0 {
            return Err(EngineError::config_error("HISTORY_WINDOW must be positive"));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(EngineError::config_error(
                "DETECTION_CONFIDENCE must be between 0 and 1",
            ));
        }
        Ok(())
    }

    pub fn wave_config(&self) -> WaveScorerConfig {
        WaveScorerConfig::default().with_history_window(self.history_window)
    }

    pub fn http_camera_config(&self) -> HttpCameraConfig {
        HttpCameraConfig {
            request_timeout: self.camera.timeout,
            probe_timeout: self.camera.probe_timeout,
            retry_count: self.camera.retry_count,
            mode: self.camera.mode,
            snapshot_interval: self.camera.snapshot_interval,
            ..HttpCameraConfig::default()
        }
    }
}

struct Lookup<'a, F>(&'a F);

impl<F> Lookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str, default: T) -> EngineResult<T>
    where
        T: FromStr,
    {
        match self.string(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| EngineError::config_error(format!("invalid value for {key}: {raw}"))),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> EngineResult<bool> {
        match self.string(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(EngineError::config_error(format!(
                "invalid boolean for {key}: {v}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> EngineResult<EngineConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.analysis_interval, Duration::from_secs(5));
        assert_eq!(config.frame_wait_backoff, Duration::from_secs(1));
        assert_eq!(config.history_window, 30);
        assert_eq!(config.result_history_capacity, 100);
        assert!(config.save_frames);
        assert_eq!(config.frames_dir, PathBuf::from("saved_frames"));
        assert_eq!(config.camera.mode, CaptureMode::Stream);
        assert!(config.yolo_model_path.is_none());
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("ANALYSIS_INTERVAL_SECS", "2"),
            ("HISTORY_WINDOW", "10"),
            ("SAVE_FRAMES", "false"),
            ("CAMERA_MODE", "snapshot"),
            ("SNAPSHOT_INTERVAL_MS", "250"),
            ("YOLO_MODEL_PATH", "models/yolov8n.onnx"),
            ("METRICS_ENABLED", "1"),
        ])
        .unwrap();

        assert_eq!(config.analysis_interval, Duration::from_secs(2));
        assert_eq!(config.wave_config().history_window, 10);
        assert!(!config.save_frames);
        assert_eq!(config.camera.mode, CaptureMode::Snapshot);
        assert_eq!(
            config.http_camera_config().snapshot_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.yolo_model_path.as_deref(), Some("models/yolov8n.onnx"));
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(from_pairs(&[("ANALYSIS_INTERVAL_SECS", "soon")]).is_err());
        assert!(from_pairs(&[("ANALYSIS_INTERVAL_SECS", "0")]).is_err());
        assert!(from_pairs(&[("SAVE_FRAMES", "maybe")]).is_err());
        assert!(from_pairs(&[("DETECTION_CONFIDENCE", "1.5")]).is_err());
        assert!(from_pairs(&[("CAMERA_MODE", "rtsp")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = from_pairs(&[("HISTORY_WINDOW", "  "), ("YOLO_MODEL_PATH", "")]).unwrap();
        assert_eq!(config.history_window, 30);
        assert!(config.yolo_model_path.is_none());
    }
}
