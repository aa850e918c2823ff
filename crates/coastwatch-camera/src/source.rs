//! Frame source contract.

use std::sync::Arc;

use async_trait::async_trait;

use coastwatch_models::{CameraHandle, CameraId};
use coastwatch_vision::Frame;

use crate::error::CameraResult;

/// Supplies the latest decoded frame for one camera.
///
/// `start` connects and spawns a background pump that keeps publishing the
/// newest good frame; decode failures inside the pump are skipped and never
/// surface through `latest`. `stop` must be idempotent and safe to call
/// when `start` never succeeded.
#[async_trait]
pub trait FrameSource: Send + Sync {
    fn camera_id(&self) -> &CameraId;

    /// Connect and start the frame pump. Calling it while running is a no-op.
    async fn start(&self) -> CameraResult<()>;

    /// Stop the pump and release the connection.
    async fn stop(&self);

    /// Newest complete frame, or `None` until one has been decoded.
    fn latest(&self) -> Option<Frame>;

    /// Whether the pump is currently receiving frames.
    fn is_streaming(&self) -> bool;

    /// Probe the camera without starting the pump.
    async fn check_connection(&self) -> CameraResult<()>;
}

/// Builds a frame source for a registered camera.
pub trait SourceFactory: Send + Sync {
    fn create(&self, handle: &CameraHandle) -> CameraResult<Arc<dyn FrameSource>>;
}
