//! HTTP camera source.
//!
//! Cameras expose:
//! - `GET /` for reachability probing
//! - `GET /stream` as an MJPEG `multipart/x-mixed-replace` body
//! - `GET /capture` for a single JPEG snapshot
//! - `POST /control` and `GET /info` for camera settings
//!
//! In stream mode the pump reads `/stream` and reconnects with backoff when
//! the body ends or fails. In snapshot mode it polls `/capture`.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use coastwatch_models::{CameraHandle, CameraHandleError, CameraId};
use coastwatch_vision::Frame;

use crate::buffer::FrameBuffer;
use crate::error::{CameraError, CameraResult};
use crate::metrics::{record_frame_decoded, record_frame_dropped, record_reconnect};
use crate::mjpeg::MjpegSplitter;
use crate::retry::{retry_async, FailureTracker, RetryConfig};
use crate::source::{FrameSource, SourceFactory};

/// Consecutive pump failures logged before suppression kicks in.
const MAX_LOGGED_FAILURES: u32 = 3;

/// How the pump obtains frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    #[default]
    Stream,
    Snapshot,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Stream => "stream",
            CaptureMode::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "mjpeg" => Ok(CaptureMode::Stream),
            "snapshot" | "capture" => Ok(CaptureMode::Snapshot),
            other => Err(format!("unknown capture mode: {other}")),
        }
    }
}

/// HTTP camera tuning.
#[derive(Debug, Clone)]
pub struct HttpCameraConfig {
    /// Timeout for snapshot and control requests, and for stream headers
    pub request_timeout: Duration,
    /// Timeout for the reachability probe
    pub probe_timeout: Duration,
    /// Retries for a snapshot capture
    pub retry_count: u32,
    pub mode: CaptureMode,
    /// Poll period in snapshot mode
    pub snapshot_interval: Duration,
    /// Backoff between stream reconnects
    pub reconnect: RetryConfig,
    /// Bounded wait for the pump to exit on stop
    pub stop_timeout: Duration,
}

impl Default for HttpCameraConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            retry_count: 3,
            mode: CaptureMode::Stream,
            snapshot_interval: Duration::from_millis(1000),
            reconnect: RetryConfig::new("stream_reconnect")
                .with_base_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(30)),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

impl HttpCameraConfig {
    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn snapshot_retry(&self) -> RetryConfig {
        RetryConfig::new("capture_snapshot").with_max_retries(self.retry_count)
    }
}

/// Build the shared HTTP client. Per-request timeouts are applied by the
/// caller so that long-lived stream bodies are not cut off.
pub fn build_client(config: &HttpCameraConfig) -> CameraResult<Client> {
    Client::builder()
        .connect_timeout(config.probe_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("coastwatch-camera/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(CameraError::Network)
}

/// State shared between the camera handle and its pump task.
struct CameraInner {
    handle: CameraHandle,
    base_url: Url,
    client: Client,
    config: HttpCameraConfig,
    buffer: FrameBuffer,
    streaming: AtomicBool,
}

struct Pump {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Frame source backed by an HTTP camera.
pub struct HttpCamera {
    inner: Arc<CameraInner>,
    pump: Mutex<Option<Pump>>,
}

impl HttpCamera {
    pub fn new(handle: CameraHandle, config: HttpCameraConfig) -> CameraResult<Self> {
        let client = build_client(&config)?;
        Self::with_client(handle, config, client)
    }

    /// Build with an existing client so that cameras share a pool.
    pub fn with_client(
        handle: CameraHandle,
        config: HttpCameraConfig,
        client: Client,
    ) -> CameraResult<Self> {
        handle.validate()?;
        let base_url = handle.base_url()?;
        Ok(Self {
            inner: Arc::new(CameraInner {
                handle,
                base_url,
                client,
                config,
                buffer: FrameBuffer::new(),
                streaming: AtomicBool::new(false),
            }),
            pump: Mutex::new(None),
        })
    }

    pub fn handle(&self) -> &CameraHandle {
        &self.inner.handle
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.inner.buffer
    }

    /// Fetch one snapshot, retrying transient failures.
    pub async fn capture_snapshot(&self) -> CameraResult<Frame> {
        self.inner.capture_snapshot().await
    }

    /// Push settings to the camera.
    pub async fn set_settings(&self, settings: &serde_json::Value) -> CameraResult<()> {
        let url = self.inner.endpoint("control")?;
        let response = self
            .inner
            .request(Method::POST, url.clone())
            .timeout(self.inner.config.request_timeout)
            .json(settings)
            .send()
            .await
            .map_err(|e| self.inner.transport_error(e))?;
        ensure_ok(&response, &url)?;
        debug!(camera_id = %self.inner.handle.camera_id, "Camera settings updated");
        Ok(())
    }

    /// Read the camera's self-reported info document.
    pub async fn info(&self) -> CameraResult<serde_json::Value> {
        let url = self.inner.endpoint("info")?;
        let response = self
            .inner
            .request(Method::GET, url.clone())
            .timeout(self.inner.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.inner.transport_error(e))?;
        ensure_ok(&response, &url)?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.inner.transport_error(e))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn pump_slot(&self) -> MutexGuard<'_, Option<Pump>> {
        self.pump.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_pumping(&self) -> bool {
        self.pump_slot()
            .as_ref()
            .is_some_and(|pump| !pump.task.is_finished())
    }
}

#[async_trait]
impl FrameSource for HttpCamera {
    fn camera_id(&self) -> &CameraId {
        &self.inner.handle.camera_id
    }

    async fn start(&self) -> CameraResult<()> {
        if self.is_pumping() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let task = match self.inner.config.mode {
            CaptureMode::Stream => {
                let response = self.inner.open_stream().await?;
                self.inner.streaming.store(true, Ordering::SeqCst);
                tokio::spawn(run_stream_pump(inner, response, shutdown_rx))
            }
            CaptureMode::Snapshot => {
                let first = self.inner.capture_snapshot().await?;
                self.inner.buffer.publish(first);
                self.inner.streaming.store(true, Ordering::SeqCst);
                tokio::spawn(run_snapshot_pump(inner, shutdown_rx))
            }
        };

        let mut slot = self.pump_slot();
        if slot.as_ref().is_some_and(|p| !p.task.is_finished()) {
            // Lost a race with a concurrent start.
            let _ = shutdown_tx.send(true);
            task.abort();
            return Ok(());
        }
        *slot = Some(Pump {
            shutdown: shutdown_tx,
            task,
        });

        info!(
            camera_id = %self.inner.handle.camera_id,
            mode = %self.inner.config.mode,
            url = %self.inner.base_url,
            "Camera frame pump started"
        );
        Ok(())
    }

    async fn stop(&self) {
        let pump = self.pump_slot().take();
        if let Some(pump) = pump {
            let _ = pump.shutdown.send(true);
            let mut task = pump.task;
            if tokio::time::timeout(self.inner.config.stop_timeout, &mut task)
                .await
                .is_err()
            {
                warn!(
                    camera_id = %self.inner.handle.camera_id,
                    "Frame pump did not exit in time, aborting"
                );
                task.abort();
            }
            info!(camera_id = %self.inner.handle.camera_id, "Camera frame pump stopped");
        }
        self.inner.streaming.store(false, Ordering::SeqCst);
        self.inner.buffer.clear();
    }

    fn latest(&self) -> Option<Frame> {
        self.inner.buffer.latest()
    }

    fn is_streaming(&self) -> bool {
        self.inner.streaming.load(Ordering::SeqCst)
    }

    async fn check_connection(&self) -> CameraResult<()> {
        let url = self.inner.base_url.clone();
        let response = self
            .inner
            .request(Method::GET, url.clone())
            .timeout(self.inner.config.probe_timeout)
            .send()
            .await
            .map_err(|e| self.inner.transport_error(e))?;
        ensure_ok(&response, &url)
    }
}

impl Drop for HttpCamera {
    fn drop(&mut self) {
        if let Some(pump) = self.pump_slot().take() {
            pump.task.abort();
        }
    }
}

impl CameraInner {
    fn address(&self) -> String {
        format!("{}:{}", self.handle.address, self.handle.port)
    }

    fn endpoint(&self, path: &str) -> CameraResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CameraHandleError::InvalidUrl(e.to_string()).into())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.handle.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
            None => builder,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> CameraError {
        CameraError::from_transport(&self.address(), err)
    }

    async fn open_stream(&self) -> CameraResult<Response> {
        let url = self.endpoint("stream")?;
        let send = self.request(Method::GET, url.clone()).send();
        let response = tokio::time::timeout(self.config.request_timeout, send)
            .await
            .map_err(|_| CameraError::Timeout(format!("{} stream headers", self.address())))?
            .map_err(|e| self.transport_error(e))?;
        ensure_ok(&response, &url)?;
        Ok(response)
    }

    async fn fetch_snapshot(&self) -> CameraResult<Frame> {
        let url = self.endpoint("capture")?;
        let response = self
            .request(Method::GET, url.clone())
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        ensure_ok(&response, &url)?;
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        decode_jpeg(body.to_vec()).await
    }

    async fn capture_snapshot(&self) -> CameraResult<Frame> {
        retry_async(
            &self.config.snapshot_retry(),
            CameraError::is_retryable,
            || self.fetch_snapshot(),
        )
        .await
    }
}

fn ensure_ok(response: &Response, url: &Url) -> CameraResult<()> {
    match response.status() {
        StatusCode::OK => Ok(()),
        status => Err(CameraError::http(status.as_u16(), url.as_str())),
    }
}

/// Decode off the async workers.
async fn decode_jpeg(bytes: Vec<u8>) -> CameraResult<Frame> {
    tokio::task::spawn_blocking(move || Frame::from_jpeg(&bytes))
        .await
        .map_err(|e| CameraError::decode(e.to_string()))?
        .map_err(|e| CameraError::decode(e.to_string()))
}

/// Sleep for `delay` unless shutdown is requested first.
/// Returns `true` when the pump should exit.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => *shutdown.borrow(),
        _ = shutdown.changed() => true,
    }
}

enum StreamEnd {
    Shutdown,
    Closed,
    Failed(String),
}

async fn run_stream_pump(
    inner: Arc<CameraInner>,
    first: Response,
    mut shutdown: watch::Receiver<bool>,
) {
    let camera_id = inner.handle.camera_id.clone();
    let mut tracker = FailureTracker::new(MAX_LOGGED_FAILURES);
    let mut pending = Some(first);
    let mut attempt = 0u32;

    loop {
        let response = match pending.take() {
            Some(response) => response,
            None => {
                attempt += 1;
                let delay = inner.config.reconnect.delay_for_attempt(attempt);
                if wait_or_shutdown(&mut shutdown, delay).await {
                    break;
                }
                record_reconnect(camera_id.as_str());
                match inner.open_stream().await {
                    Ok(response) => response,
                    Err(e) => {
                        if tracker.record_failure() {
                            warn!(camera_id = %camera_id, error = %e, attempt, "Stream reconnect failed");
                        }
                        continue;
                    }
                }
            }
        };

        inner.streaming.store(true, Ordering::SeqCst);
        let (end, decoded) = consume_stream(&inner, response, &mut shutdown, &mut tracker).await;
        inner.streaming.store(false, Ordering::SeqCst);
        if decoded > 0 {
            attempt = 0;
        }

        match end {
            StreamEnd::Shutdown => break,
            StreamEnd::Closed => {
                debug!(camera_id = %camera_id, decoded, "Camera stream closed, reconnecting");
            }
            StreamEnd::Failed(e) => {
                if tracker.record_failure() {
                    warn!(camera_id = %camera_id, error = %e, "Camera stream failed, reconnecting");
                }
            }
        }
    }

    inner.streaming.store(false, Ordering::SeqCst);
    debug!(camera_id = %camera_id, "Stream pump exited");
}

/// Read one stream body until it ends or shutdown is requested.
/// Returns how it ended and how many frames were published.
async fn consume_stream(
    inner: &CameraInner,
    response: Response,
    shutdown: &mut watch::Receiver<bool>,
    tracker: &mut FailureTracker,
) -> (StreamEnd, u64) {
    let camera_id = inner.handle.camera_id.as_str();
    let mut splitter = MjpegSplitter::new();
    let mut body = response.bytes_stream();
    let mut decoded = 0u64;

    loop {
        let chunk = tokio::select! {
            _ = shutdown.changed() => return (StreamEnd::Shutdown, decoded),
            chunk = body.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => return (StreamEnd::Failed(e.to_string()), decoded),
            None => return (StreamEnd::Closed, decoded),
        };

        for jpeg in splitter.push(&bytes) {
            match decode_jpeg(jpeg).await {
                Ok(frame) => {
                    inner.buffer.publish(frame);
                    decoded += 1;
                    tracker.record_success();
                    record_frame_decoded(camera_id, CaptureMode::Stream.as_str());
                }
                Err(e) => {
                    record_frame_dropped(camera_id, CaptureMode::Stream.as_str());
                    if tracker.record_failure() {
                        debug!(camera_id, error = %e, "Skipping undecodable frame");
                    }
                }
            }
        }
    }
}

async fn run_snapshot_pump(inner: Arc<CameraInner>, mut shutdown: watch::Receiver<bool>) {
    let camera_id = inner.handle.camera_id.clone();
    let mut tracker = FailureTracker::new(MAX_LOGGED_FAILURES);

    loop {
        if wait_or_shutdown(&mut shutdown, inner.config.snapshot_interval).await {
            break;
        }

        let result = tokio::select! {
            result = inner.fetch_snapshot() => result,
            _ = shutdown.changed() => break,
        };

        match result {
            Ok(frame) => {
                inner.buffer.publish(frame);
                inner.streaming.store(true, Ordering::SeqCst);
                tracker.record_success();
                record_frame_decoded(camera_id.as_str(), CaptureMode::Snapshot.as_str());
            }
            Err(e) => {
                if e.is_connectivity() {
                    inner.streaming.store(false, Ordering::SeqCst);
                }
                record_frame_dropped(camera_id.as_str(), CaptureMode::Snapshot.as_str());
                if tracker.record_failure() {
                    warn!(camera_id = %camera_id, error = %e, "Snapshot poll failed");
                }
            }
        }
    }

    inner.streaming.store(false, Ordering::SeqCst);
    debug!(camera_id = %camera_id, "Snapshot pump exited");
}

/// Creates [`HttpCamera`] sources sharing one HTTP client.
#[derive(Clone)]
pub struct HttpSourceFactory {
    config: HttpCameraConfig,
    client: Client,
}

impl HttpSourceFactory {
    pub fn new(config: HttpCameraConfig) -> CameraResult<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpCameraConfig {
        &self.config
    }
}

impl SourceFactory for HttpSourceFactory {
    fn create(&self, handle: &CameraHandle) -> CameraResult<Arc<dyn FrameSource>> {
        let camera =
            HttpCamera::with_client(handle.clone(), self.config.clone(), self.client.clone())?;
        Ok(Arc::new(camera))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_mode_parse() {
        assert_eq!("stream".parse::<CaptureMode>(), Ok(CaptureMode::Stream));
        assert_eq!("SNAPSHOT".parse::<CaptureMode>(), Ok(CaptureMode::Snapshot));
        assert!("rtsp".parse::<CaptureMode>().is_err());
    }

    #[test]
    fn test_endpoints_resolve_against_base() {
        let camera = HttpCamera::new(
            CameraHandle::new("beach", "10.0.0.7").with_port(8080),
            HttpCameraConfig::default(),
        )
        .unwrap();
        assert_eq!(
            camera.inner.endpoint("capture").unwrap().as_str(),
            "http://10.0.0.7:8080/capture"
        );
    }

    #[test]
    fn test_invalid_handle_rejected() {
        let result = HttpCamera::new(CameraHandle::new("", "10.0.0.7"), HttpCameraConfig::default());
        assert!(matches!(result, Err(CameraError::InvalidHandle(_))));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_safe() {
        let camera = HttpCamera::new(
            CameraHandle::new("beach", "127.0.0.1"),
            HttpCameraConfig::default(),
        )
        .unwrap();
        camera.stop().await;
        camera.stop().await;
        assert!(!camera.is_streaming());
        assert!(camera.latest().is_none());
    }
}
