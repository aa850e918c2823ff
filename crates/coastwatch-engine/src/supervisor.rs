//! Camera registry and analysis lifecycle.
//!
//! The supervisor owns every registered camera's frame source and, while
//! analysis runs, its loop handle. The registry lock is never held across
//! network calls or loop joins.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use coastwatch_camera::{FrameSource, SourceFactory};
use coastwatch_models::{
    AnalysisRecord, AnalysisResult, CameraHandle, CameraId, CameraStatus, LoopState,
};
use coastwatch_storage::{AnalysisSink, FrameArchive};
use coastwatch_vision::{CrowdScorer, Frame, PeopleDetector};

use crate::analysis_loop::{
    CameraAnalyzer, LoopConfig, LoopHandle, PerCameraAnalysisLoop, ResultPublisher,
};
use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::metrics;

/// Capacity of the live result broadcast.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Outcome of registering a camera.
#[derive(Debug, Clone)]
pub struct Registration {
    pub camera_id: CameraId,
    /// Whether the reachability probe succeeded
    pub reachable: bool,
    /// Probe failure, when unreachable
    pub warning: Option<String>,
}

struct CameraEntry {
    handle: CameraHandle,
    source: Arc<dyn FrameSource>,
    analysis: Option<LoopHandle>,
    /// Token of the start currently connecting; cleared by a stop.
    starting: Option<u64>,
    start_generation: u64,
}

impl CameraEntry {
    fn new(handle: CameraHandle, source: Arc<dyn FrameSource>) -> Self {
        Self {
            handle,
            source,
            analysis: None,
            starting: None,
            start_generation: 0,
        }
    }

    fn is_analyzing(&self) -> bool {
        self.analysis.as_ref().is_some_and(LoopHandle::is_running)
    }

    fn begin_start(&mut self) -> u64 {
        self.start_generation += 1;
        self.starting = Some(self.start_generation);
        self.start_generation
    }

    /// Claims the in-flight start; `false` once a stop has cancelled it.
    fn finish_start(&mut self, token: u64) -> bool {
        if self.starting == Some(token) {
            self.starting = None;
            true
        } else {
            false
        }
    }
}

/// Stores, broadcasts and persists each completed cycle.
struct SupervisorPublisher {
    cache: Arc<ResultCache>,
    sink: Arc<dyn AnalysisSink>,
    archive: Option<FrameArchive>,
    events: broadcast::Sender<AnalysisResult>,
    sink_timeout: Duration,
}

impl SupervisorPublisher {
    async fn save_frame(&self, frame: &Frame, result: &AnalysisResult) -> Option<PathBuf> {
        let archive = self.archive.as_ref()?;
        archive
            .save(frame, &result.camera_id, result.timestamp, &result.crowd.detections)
            .await
            .map_err(|e| warn!(camera_id = %result.camera_id, error = %e, "Failed to save frame"))
            .ok()
    }

    /// Frame save then sink append, under one `sink_timeout`.
    async fn persist(&self, frame: &Frame, result: &AnalysisResult) -> EngineResult<()> {
        let hand_off = async {
            let frame_path = self
                .save_frame(frame, result)
                .await
                .map(|p| p.display().to_string());
            let record = AnalysisRecord::new(result.clone(), frame_path);
            self.sink.append(&record).await
        };
        tokio::time::timeout(self.sink_timeout, hand_off)
            .await
            .map_err(|_| EngineError::SinkTimeout(self.sink_timeout))??;
        Ok(())
    }
}

#[async_trait]
impl ResultPublisher for SupervisorPublisher {
    async fn publish(&self, frame: &Frame, result: &AnalysisResult) {
        // The in-memory view is updated first so persistence problems never
        // hide the newest result.
        self.cache.record(result.clone());
        let _ = self.events.send(result.clone());

        if let Err(e) = self.persist(frame, result).await {
            metrics::record_sink_failure(self.sink.name());
            warn!(
                camera_id = %result.camera_id,
                sink = self.sink.name(),
                error = %e,
                "Failed to persist analysis result"
            );
        }
    }
}

/// Manages registered cameras and their analysis loops.
pub struct AnalysisSupervisor {
    config: EngineConfig,
    factory: Arc<dyn SourceFactory>,
    detector: Arc<dyn PeopleDetector>,
    sink: Arc<dyn AnalysisSink>,
    cache: Arc<ResultCache>,
    events: broadcast::Sender<AnalysisResult>,
    publisher: Arc<SupervisorPublisher>,
    registry: RwLock<HashMap<CameraId, CameraEntry>>,
}

impl AnalysisSupervisor {
    pub fn new(
        config: EngineConfig,
        factory: Arc<dyn SourceFactory>,
        detector: Arc<dyn PeopleDetector>,
        sink: Arc<dyn AnalysisSink>,
    ) -> Self {
        let cache = Arc::new(ResultCache::new(config.result_history_capacity));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let archive = config.save_frames.then(|| {
            FrameArchive::new(&config.frames_dir).with_annotations(config.annotate_saved_frames)
        });
        let publisher = Arc::new(SupervisorPublisher {
            cache: Arc::clone(&cache),
            sink: Arc::clone(&sink),
            archive,
            events: events.clone(),
            sink_timeout: config.sink_timeout,
        });

        info!(
            detector = detector.name(),
            detector_available = detector.is_available(),
            sink = sink.name(),
            save_frames = config.save_frames,
            "Analysis supervisor created"
        );

        Self {
            config,
            factory,
            detector,
            sink,
            cache,
            events,
            publisher,
            registry: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a camera after probing it.
    ///
    /// An unreachable camera is still registered; the returned
    /// [`Registration`] carries the warning and starting analysis will fail
    /// cleanly until it comes back.
    pub async fn add_camera(&self, handle: CameraHandle) -> EngineResult<Registration> {
        handle.validate()?;
        let camera_id = handle.camera_id.clone();
        if self.registry.read().await.contains_key(&camera_id) {
            return Err(EngineError::AlreadyRegistered(camera_id));
        }

        let source = self.factory.create(&handle)?;
        let (reachable, warning) = match source.check_connection().await {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(
                    camera_id = %camera_id,
                    address = %handle.address,
                    port = handle.port,
                    error = %e,
                    "Camera unreachable, registering anyway"
                );
                (false, Some(e.to_string()))
            }
        };

        let mut registry = self.registry.write().await;
        if registry.contains_key(&camera_id) {
            return Err(EngineError::AlreadyRegistered(camera_id));
        }
        info!(
            camera_id = %camera_id,
            address = %handle.address,
            port = handle.port,
            reachable,
            "Camera registered"
        );
        registry.insert(camera_id.clone(), CameraEntry::new(handle, source));

        Ok(Registration {
            camera_id,
            reachable,
            warning,
        })
    }

    /// Unregister a camera, stopping its loop and source.
    pub async fn remove_camera(&self, camera_id: &CameraId) -> EngineResult<()> {
        let entry = self
            .registry
            .write()
            .await
            .remove(camera_id)
            .ok_or_else(|| EngineError::CameraNotFound(camera_id.clone()))?;

        if let Some(analysis) = entry.analysis {
            analysis.stop(self.config.shutdown_timeout).await;
        }
        entry.source.stop().await;
        self.cache.remove(camera_id);

        info!(camera_id = %camera_id, "Camera removed");
        Ok(())
    }

    /// Start analysis. Starting an already running (or already starting)
    /// camera is a no-op.
    ///
    /// The source connects without the registry lock held. A stop or remove
    /// issued meanwhile cancels this start: the source is stopped again and
    /// no loop is spawned.
    pub async fn start_analysis(&self, camera_id: &CameraId) -> EngineResult<()> {
        let (source, token) = {
            let mut registry = self.registry.write().await;
            let entry = registry
                .get_mut(camera_id)
                .ok_or_else(|| EngineError::CameraNotFound(camera_id.clone()))?;
            if entry.is_analyzing() {
                debug!(camera_id = %camera_id, "Analysis already running");
                return Ok(());
            }
            if entry.starting.is_some() {
                debug!(camera_id = %camera_id, "Analysis already starting");
                return Ok(());
            }
            (Arc::clone(&entry.source), entry.begin_start())
        };

        if let Err(e) = source.start().await {
            warn!(camera_id = %camera_id, error = %e, "Failed to start camera source");
            if let Some(entry) = self.registry.write().await.get_mut(camera_id) {
                entry.finish_start(token);
            }
            return Err(e.into());
        }

        let mut registry = self.registry.write().await;
        let claim = registry.get_mut(camera_id).map(|entry| {
            let claimed = entry.finish_start(token);
            (claimed, entry.starting.is_some() || entry.is_analyzing())
        });
        match claim {
            Some((true, _)) => {}
            Some((false, superseded)) => {
                drop(registry);
                // A newer start owns the source once one is pending.
                if !superseded {
                    source.stop().await;
                }
                info!(camera_id = %camera_id, "Start cancelled by a concurrent stop");
                return Ok(());
            }
            None => {
                // Removed while connecting.
                drop(registry);
                source.stop().await;
                return Err(EngineError::CameraNotFound(camera_id.clone()));
            }
        }
        let entry = registry
            .get_mut(camera_id)
            .ok_or_else(|| EngineError::CameraNotFound(camera_id.clone()))?;

        let analyzer = CameraAnalyzer::new(
            camera_id.clone(),
            self.config.wave_config(),
            CrowdScorer::new(self.config.detection_confidence),
            Arc::clone(&self.detector),
        );
        let publisher: Arc<dyn ResultPublisher> = self.publisher.clone();
        let analysis_loop = PerCameraAnalysisLoop::new(
            Arc::clone(&entry.source),
            analyzer,
            publisher,
            LoopConfig::from(&self.config),
        );
        entry.analysis = Some(analysis_loop.spawn());

        info!(camera_id = %camera_id, "Analysis started");
        Ok(())
    }

    /// Stop analysis and release the camera's source.
    ///
    /// The loop finishes its in-flight cycle; the wait is bounded by the
    /// shutdown timeout. A start still connecting is cancelled. Stopping a
    /// camera that is not running is a no-op.
    pub async fn stop_analysis(&self, camera_id: &CameraId) -> EngineResult<()> {
        let (analysis, source) = {
            let mut registry = self.registry.write().await;
            let entry = registry
                .get_mut(camera_id)
                .ok_or_else(|| EngineError::CameraNotFound(camera_id.clone()))?;
            entry.starting = None;
            (entry.analysis.take(), Arc::clone(&entry.source))
        };

        if let Some(analysis) = analysis {
            let ran_for = Utc::now() - analysis.started_at();
            if let Some(stats) = analysis.stop(self.config.shutdown_timeout).await {
                debug!(
                    camera_id = %camera_id,
                    cycles = stats.cycles,
                    failures = stats.failures,
                    "Analysis loop joined"
                );
            }
            info!(
                camera_id = %camera_id,
                ran_for_secs = ran_for.num_seconds(),
                "Analysis stopped"
            );
        }
        source.stop().await;
        Ok(())
    }

    /// Stop every loop. Each join is bounded by the shutdown timeout.
    pub async fn shutdown_all(&self) {
        let (handles, sources): (Vec<LoopHandle>, Vec<Arc<dyn FrameSource>>) = {
            let mut registry = self.registry.write().await;
            let handles = registry
                .values_mut()
                .filter_map(|entry| {
                    entry.starting = None;
                    entry.analysis.take()
                })
                .collect();
            let sources = registry.values().map(|e| Arc::clone(&e.source)).collect();
            (handles, sources)
        };

        info!(loops = handles.len(), "Shutting down analysis");
        for handle in &handles {
            handle.request_stop();
        }
        let timeout = self.config.shutdown_timeout;
        join_all(handles.into_iter().map(|h| h.join(timeout))).await;
        join_all(sources.iter().map(|s| s.stop())).await;
        info!("Analysis shutdown complete");
    }

    /// Newest result, from memory or else from the sink.
    pub async fn latest_result(&self, camera_id: &CameraId) -> Option<AnalysisResult> {
        if let Some(result) = self.cache.latest(camera_id) {
            return Some(result);
        }
        match self.sink.latest(camera_id).await {
            Ok(record) => record.map(|r| r.result),
            Err(e) => {
                warn!(camera_id = %camera_id, error = %e, "Failed to read latest result from sink");
                None
            }
        }
    }

    /// Up to `limit` results, newest first. Reads the sink and falls back to
    /// the in-memory history if the sink fails.
    pub async fn history(&self, camera_id: &CameraId, limit: usize) -> Vec<AnalysisResult> {
        match self.sink.history(camera_id, limit).await {
            Ok(records) => records.into_iter().map(|r| r.result).collect(),
            Err(e) => {
                warn!(camera_id = %camera_id, error = %e, "Sink history unavailable, using memory");
                self.cache.history(camera_id, limit)
            }
        }
    }

    pub async fn loop_state(&self, camera_id: &CameraId) -> EngineResult<LoopState> {
        let registry = self.registry.read().await;
        let entry = registry
            .get(camera_id)
            .ok_or_else(|| EngineError::CameraNotFound(camera_id.clone()))?;
        Ok(if entry.is_analyzing() {
            LoopState::Running
        } else {
            LoopState::Stopped
        })
    }

    /// Probe the camera and report its state.
    pub async fn status(&self, camera_id: &CameraId) -> EngineResult<CameraStatus> {
        let (handle, source, analyzing) = {
            let registry = self.registry.read().await;
            let entry = registry
                .get(camera_id)
                .ok_or_else(|| EngineError::CameraNotFound(camera_id.clone()))?;
            (entry.handle.clone(), Arc::clone(&entry.source), entry.is_analyzing())
        };

        let connected = source.check_connection().await.is_ok();
        let has_result = self.cache.has_result(camera_id) || self.sink_has_result(camera_id).await;
        Ok(CameraStatus {
            camera_id: handle.camera_id.clone(),
            address: handle.address,
            port: handle.port,
            connected,
            streaming: source.is_streaming(),
            analyzing,
            has_result,
        })
    }

    /// Whether the sink holds a record, bounded by `sink_timeout`.
    async fn sink_has_result(&self, camera_id: &CameraId) -> bool {
        match tokio::time::timeout(self.config.sink_timeout, self.sink.latest(camera_id)).await {
            Ok(Ok(record)) => record.is_some(),
            Ok(Err(e)) => {
                debug!(camera_id = %camera_id, error = %e, "Sink lookup failed");
                false
            }
            Err(_) => {
                debug!(camera_id = %camera_id, "Sink lookup timed out");
                false
            }
        }
    }

    pub async fn all_statuses(&self) -> Vec<CameraStatus> {
        let ids: Vec<CameraId> = self.list_cameras().await.into_iter().map(|h| h.camera_id).collect();
        let statuses = join_all(ids.iter().map(|id| self.status(id))).await;
        statuses.into_iter().filter_map(Result::ok).collect()
    }

    /// Registered cameras, ordered by id.
    pub async fn list_cameras(&self) -> Vec<CameraHandle> {
        let mut handles: Vec<CameraHandle> = self
            .registry
            .read()
            .await
            .values()
            .map(|e| e.handle.clone())
            .collect();
        handles.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        handles
    }

    pub fn all_latest_results(&self) -> Vec<AnalysisResult> {
        self.cache.all_latest()
    }

    /// Number of cameras with a running loop.
    pub async fn running_count(&self) -> usize {
        self.registry
            .read()
            .await
            .values()
            .filter(|e| e.is_analyzing())
            .count()
    }

    /// Live feed of completed cycles.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisResult> {
        self.events.subscribe()
    }
}
