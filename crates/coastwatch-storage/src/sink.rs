//! Analysis sink contract.

use async_trait::async_trait;

use coastwatch_models::{AnalysisRecord, CameraId};

use crate::error::StorageResult;

/// Durable, append-only history of analysis records.
///
/// Appends from different cameras are independent; no cross-camera ordering
/// is required.
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    async fn append(&self, record: &AnalysisRecord) -> StorageResult<()>;

    /// Most recent record for a camera.
    async fn latest(&self, camera_id: &CameraId) -> StorageResult<Option<AnalysisRecord>> {
        Ok(self.history(camera_id, 1).await?.into_iter().next())
    }

    /// Up to `limit` records for a camera, newest first.
    async fn history(&self, camera_id: &CameraId, limit: usize)
        -> StorageResult<Vec<AnalysisRecord>>;

    fn name(&self) -> &str;
}
