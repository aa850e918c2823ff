//! Fakes shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{GrayImage, Luma};

use coastwatch_camera::{CameraError, CameraResult, FrameSource, SourceFactory};
use coastwatch_engine::{AnalysisSupervisor, EngineConfig};
use coastwatch_models::{
    AnalysisRecord, AnalysisResult, BoundingBox, CameraHandle, CameraId, PersonDetection,
};
use coastwatch_storage::{AnalysisSink, StorageError, StorageResult};
use coastwatch_vision::{DetectorError, Frame, PeopleDetector};

/// Checkerboard that flips phase with `step` so consecutive frames differ.
pub fn test_frame(step: usize) -> Frame {
    let phase = (step % 2) as u32;
    Frame::from_gray(GrayImage::from_fn(64, 48, |x, y| {
        if ((x / 8) + (y / 8) + phase) % 2 == 0 {
            Luma([220])
        } else {
            Luma([30])
        }
    }))
}

/// Scriptable in-process frame source.
pub struct FakeSource {
    id: CameraId,
    has_frames: AtomicBool,
    invalid_frames: AtomicUsize,
    probe_fails: bool,
    start_fails: bool,
    start_delay: Duration,
    streaming: AtomicBool,
    served: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(id: &str) -> Self {
        Self {
            id: CameraId::new(id),
            has_frames: AtomicBool::new(true),
            invalid_frames: AtomicUsize::new(0),
            probe_fails: false,
            start_fails: false,
            start_delay: Duration::ZERO,
            streaming: AtomicBool::new(false),
            served: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Never yields a frame.
    pub fn without_frames(self) -> Self {
        self.has_frames.store(false, Ordering::SeqCst);
        self
    }

    /// Yields `count` zero-sized frames before good ones.
    pub fn with_invalid_frames(self, count: usize) -> Self {
        self.invalid_frames.store(count, Ordering::SeqCst);
        self
    }

    /// Probe and start both fail as if the camera were offline.
    pub fn unreachable(mut self) -> Self {
        self.probe_fails = true;
        self.start_fails = true;
        self
    }

    /// Takes `delay` to connect, like a camera slow to answer.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    fn offline(&self) -> CameraError {
        CameraError::unreachable(format!("{}:80", self.id), "connection refused")
    }
}

#[async_trait]
impl FrameSource for FakeSource {
    fn camera_id(&self) -> &CameraId {
        &self.id
    }

    async fn start(&self) -> CameraResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        if self.start_fails {
            return Err(self.offline());
        }
        self.streaming.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.streaming.store(false, Ordering::SeqCst);
    }

    fn latest(&self) -> Option<Frame> {
        if !self.has_frames.load(Ordering::SeqCst) {
            return None;
        }
        let invalid = self
            .invalid_frames
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if invalid {
            return Some(Frame::from_gray(GrayImage::new(0, 0)));
        }
        Some(test_frame(self.served.fetch_add(1, Ordering::SeqCst)))
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    async fn check_connection(&self) -> CameraResult<()> {
        if self.probe_fails {
            Err(self.offline())
        } else {
            Ok(())
        }
    }
}

/// Hands out pre-built fakes by camera id.
#[derive(Default)]
pub struct FakeFactory {
    sources: Mutex<HashMap<CameraId, Arc<FakeSource>>>,
}

impl FakeFactory {
    pub fn insert(&self, source: FakeSource) -> Arc<FakeSource> {
        let source = Arc::new(source);
        self.sources
            .lock()
            .unwrap()
            .insert(source.id.clone(), Arc::clone(&source));
        source
    }
}

impl SourceFactory for FakeFactory {
    fn create(&self, handle: &CameraHandle) -> CameraResult<Arc<dyn FrameSource>> {
        let mut sources = self.sources.lock().unwrap();
        let source = sources
            .entry(handle.camera_id.clone())
            .or_insert_with(|| Arc::new(FakeSource::new(handle.camera_id.as_str())));
        Ok(Arc::clone(source) as Arc<dyn FrameSource>)
    }
}

/// Reports the same number of people on every frame.
pub struct FixedDetector(pub u32);

impl PeopleDetector for FixedDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError> {
        Ok((0..self.0)
            .map(|i| PersonDetection::person(BoundingBox::new(i as f32 * 5.0, 2.0, 4.0, 10.0), 0.9))
            .collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Holds the calling thread on every frame, like a slow model.
pub struct BlockingDetector {
    delay: Duration,
    calls: AtomicUsize,
}

impl BlockingDetector {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PeopleDetector for BlockingDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "blocking"
    }
}

/// Rejects every write and read.
pub struct FailingSink;

#[async_trait]
impl AnalysisSink for FailingSink {
    async fn append(&self, _record: &AnalysisRecord) -> StorageResult<()> {
        Err(StorageError::task("disk full"))
    }

    async fn history(&self, _camera_id: &CameraId, _limit: usize) -> StorageResult<Vec<AnalysisRecord>> {
        Err(StorageError::task("disk full"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Never finishes a write within any reasonable timeout.
pub struct SlowSink;

#[async_trait]
impl AnalysisSink for SlowSink {
    async fn append(&self, _record: &AnalysisRecord) -> StorageResult<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn history(&self, _camera_id: &CameraId, _limit: usize) -> StorageResult<Vec<AnalysisRecord>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Short cadences so lifecycle tests finish quickly.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        analysis_interval: Duration::from_millis(100),
        frame_wait_backoff: Duration::from_millis(20),
        shutdown_timeout: Duration::from_secs(2),
        sink_timeout: Duration::from_millis(200),
        save_frames: false,
        ..EngineConfig::default()
    }
}

pub fn handle(id: &str) -> CameraHandle {
    CameraHandle::new(id, "192.168.1.50")
}

pub fn supervisor_with(
    config: EngineConfig,
    factory: Arc<FakeFactory>,
    detector: Arc<dyn PeopleDetector>,
    sink: Arc<dyn AnalysisSink>,
) -> AnalysisSupervisor {
    AnalysisSupervisor::new(config, factory, detector, sink)
}

/// Poll until the camera has a result or the deadline passes.
pub async fn wait_for_result(supervisor: &AnalysisSupervisor, id: &CameraId) -> Option<AnalysisResult> {
    for _ in 0..100 {
        if let Some(result) = supervisor.latest_result(id).await {
            return Some(result);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}
