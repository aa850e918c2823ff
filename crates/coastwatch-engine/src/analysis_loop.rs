//! Per-camera analysis loop.
//!
//! Each running camera has two tasks: the frame source's pump, which keeps
//! the newest frame in its buffer, and this loop, which on a fixed cadence
//! takes the newest frame, scores it and publishes the result.
//!
//! Cancellation is cooperative. The loop checks its stop signal at the top
//! of every cycle and again before sleeping; an in-flight cycle always runs
//! to completion. Dropping the [`LoopHandle`] counts as a stop request.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

use coastwatch_camera::FrameSource;
use coastwatch_models::{AnalysisResult, CameraId};
use coastwatch_vision::{
    CrowdScorer, Frame, PeopleDetector, VisionResult, WaveIntensityScorer, WaveScorerConfig,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::logging::CameraLogger;
use crate::metrics;

/// Cadence of one loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// Sleep after every cycle, successful or not
    pub interval: Duration,
    /// Poll backoff while no frame is available
    pub frame_wait_backoff: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            frame_wait_backoff: Duration::from_secs(1),
        }
    }
}

impl From<&EngineConfig> for LoopConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            interval: config.analysis_interval,
            frame_wait_backoff: config.frame_wait_backoff,
        }
    }
}

/// Receives every completed cycle.
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    /// Must not fail and must return in bounded time.
    async fn publish(&self, frame: &Frame, result: &AnalysisResult);
}

/// Wave and crowd scoring state for one camera.
pub struct CameraAnalyzer {
    camera_id: CameraId,
    wave: WaveIntensityScorer,
    crowd: CrowdScorer,
    detector: Arc<dyn PeopleDetector>,
}

impl CameraAnalyzer {
    pub fn new(
        camera_id: CameraId,
        wave_config: WaveScorerConfig,
        crowd: CrowdScorer,
        detector: Arc<dyn PeopleDetector>,
    ) -> Self {
        Self {
            camera_id,
            wave: WaveIntensityScorer::new(wave_config),
            crowd,
            detector,
        }
    }

    /// Score one frame. Blocking; run it off the async workers.
    pub fn analyze(&mut self, frame: &Frame) -> VisionResult<AnalysisResult> {
        frame.validate()?;
        let started = Instant::now();

        let wave = self.wave.score(frame)?;
        let crowd = self.crowd.assess(self.detector.as_ref(), frame);

        Ok(AnalysisResult {
            camera_id: self.camera_id.clone(),
            timestamp: Utc::now(),
            wave,
            crowd,
            frame_width: frame.width(),
            frame_height: frame.height(),
            processing_time: (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0,
        })
    }

    pub fn frames_scored(&self) -> u64 {
        self.wave.frames_scored()
    }
}

/// Cycle counters reported when a loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub failures: u64,
}

pub struct PerCameraAnalysisLoop {
    camera_id: CameraId,
    source: Arc<dyn FrameSource>,
    analyzer: Arc<Mutex<CameraAnalyzer>>,
    publisher: Arc<dyn ResultPublisher>,
    config: LoopConfig,
    logger: CameraLogger,
}

impl PerCameraAnalysisLoop {
    pub fn new(
        source: Arc<dyn FrameSource>,
        analyzer: CameraAnalyzer,
        publisher: Arc<dyn ResultPublisher>,
        config: LoopConfig,
    ) -> Self {
        let camera_id = source.camera_id().clone();
        let logger = CameraLogger::new(&camera_id, "analysis_loop");
        Self {
            camera_id,
            source,
            analyzer: Arc::new(Mutex::new(analyzer)),
            publisher,
            config,
            logger,
        }
    }

    /// Spawn the loop task.
    pub fn spawn(self) -> LoopHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let camera_id = self.camera_id.clone();
        let span = self.logger.create_span();
        let task = tokio::spawn(self.run(shutdown_rx).instrument(span));
        LoopHandle {
            camera_id,
            shutdown: shutdown_tx,
            task,
            started_at: Utc::now(),
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) -> LoopStats {
        let mut stats = LoopStats::default();
        self.logger.log_start(&format!(
            "interval {:?}, frame wait backoff {:?}",
            self.config.interval, self.config.frame_wait_backoff
        ));
        metrics::loop_started();
        let mut waiting = false;

        loop {
            if is_stopped(&shutdown) {
                break;
            }

            let Some(frame) = self.source.latest() else {
                metrics::record_frame_wait(self.camera_id.as_str());
                if !waiting {
                    self.logger.log_warning("no frame available, waiting for camera");
                    waiting = true;
                } else {
                    debug!(camera_id = %self.camera_id, "Still waiting for a frame");
                }
                if sleep_or_stop(&mut shutdown, self.config.frame_wait_backoff).await {
                    break;
                }
                continue;
            };
            waiting = false;

            match self.run_cycle(frame).await {
                Ok(result) => {
                    stats.cycles += 1;
                    self.logger.log_cycle(&result);
                    metrics::record_cycle_completed(
                        self.camera_id.as_str(),
                        result.processing_time,
                        result.wave.current_intensity,
                        result.crowd.people_count,
                    );
                }
                Err(e) => {
                    stats.failures += 1;
                    self.logger.log_error(&format!("cycle failed: {e}"));
                    metrics::record_cycle_failed(self.camera_id.as_str());
                }
            }

            if is_stopped(&shutdown) {
                break;
            }
            if sleep_or_stop(&mut shutdown, self.config.interval).await {
                break;
            }
        }

        metrics::loop_stopped();
        self.logger.log_stop(stats.cycles, stats.failures);
        stats
    }

    /// Score a frame on the blocking pool, then publish.
    async fn run_cycle(&self, frame: Frame) -> EngineResult<AnalysisResult> {
        let analyzer = Arc::clone(&self.analyzer);
        let scored = frame.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut analyzer = analyzer.lock().unwrap_or_else(PoisonError::into_inner);
            analyzer.analyze(&scored)
        })
        .await
        .map_err(|e| EngineError::internal(format!("scoring task failed: {e}")))??;

        self.publisher.publish(&frame, &result).await;
        Ok(result)
    }
}

fn is_stopped(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// Returns `true` when the loop should exit.
async fn sleep_or_stop(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => is_stopped(shutdown),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

/// Handle to a running loop; the registry keeps one per analysing camera.
pub struct LoopHandle {
    camera_id: CameraId,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<LoopStats>,
    started_at: DateTime<Utc>,
}

impl LoopHandle {
    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop without waiting.
    pub fn request_stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Signal and wait up to `timeout` for the loop to exit.
    pub async fn stop(self, timeout: Duration) -> Option<LoopStats> {
        self.request_stop();
        self.join(timeout).await
    }

    /// Wait up to `timeout`; abort the task if it does not exit in time.
    pub async fn join(mut self, timeout: Duration) -> Option<LoopStats> {
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(e)) => {
                warn!(camera_id = %self.camera_id, error = %e, "Analysis loop task failed");
                None
            }
            Err(_) => {
                warn!(
                    camera_id = %self.camera_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Analysis loop did not stop in time, aborting"
                );
                self.task.abort();
                None
            }
        }
    }
}
