//! Saved-frame archive.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;

use coastwatch_models::{CameraId, PersonDetection};
use coastwatch_vision::frame::encode_jpeg;
use coastwatch_vision::{annotate_detections, Frame};

use crate::error::{StorageError, StorageResult};

const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Writes analysed frames to `<dir>/<camera_id>_<YYYYMMDD_HHMMSS>.jpg`.
#[derive(Debug, Clone)]
pub struct FrameArchive {
    dir: PathBuf,
    annotate: bool,
    quality: u8,
}

impl FrameArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            annotate: false,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Draw accepted detections onto saved frames.
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a frame captured at `timestamp`.
    pub fn path_for(&self, camera_id: &CameraId, timestamp: DateTime<Utc>) -> PathBuf {
        let safe_id: String = camera_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir
            .join(format!("{}_{}.jpg", safe_id, timestamp.format("%Y%m%d_%H%M%S")))
    }

    /// Encode and write one frame.
    pub async fn save(
        &self,
        frame: &Frame,
        camera_id: &CameraId,
        timestamp: DateTime<Utc>,
        detections: &[PersonDetection],
    ) -> StorageResult<PathBuf> {
        let path = self.path_for(camera_id, timestamp);

        let frame = frame.clone();
        let detections = if self.annotate { detections.to_vec() } else { Vec::new() };
        let quality = self.quality;
        let bytes = tokio::task::spawn_blocking(move || {
            let canvas = if detections.is_empty() {
                frame.image().to_rgb8()
            } else {
                annotate_detections(&frame, &detections)
            };
            encode_jpeg(&canvas, quality)
        })
        .await
        .map_err(|e| StorageError::task(e.to_string()))??;

        fs::create_dir_all(&self.dir).await?;
        fs::write(&path, &bytes).await?;

        debug!(
            camera_id = %camera_id,
            path = %path.display(),
            bytes = bytes.len(),
            "Frame saved"
        );
        Ok(path)
    }
}
