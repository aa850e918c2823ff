//! Append-only JSON-lines sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use coastwatch_models::{AnalysisRecord, CameraId};

use crate::error::StorageResult;
use crate::sink::AnalysisSink;

/// One JSON object per line, appended in completion order.
///
/// Appends are serialised through an in-process lock so that concurrent
/// cameras never interleave partial lines.
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> StorageResult<Vec<AnalysisRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AnalysisRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed analysis record"
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl AnalysisSink for JsonlSink {
    async fn append(&self, record: &AnalysisRecord) -> StorageResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(camera_id = %record.camera_id(), id = %record.id, "Analysis record appended");
        Ok(())
    }

    async fn history(
        &self,
        camera_id: &CameraId,
        limit: usize,
    ) -> StorageResult<Vec<AnalysisRecord>> {
        let records = self.read_all().await?;
        Ok(records
            .into_iter()
            .rev()
            .filter(|r| r.camera_id() == camera_id)
            .take(limit)
            .collect())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
