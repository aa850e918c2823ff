//! Bounded in-process sink.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use coastwatch_models::{AnalysisRecord, CameraId};

use crate::error::StorageResult;
use crate::sink::AnalysisSink;

/// Default records kept per camera.
pub const DEFAULT_MEMORY_CAPACITY: usize = 1000;

/// Keeps the most recent records per camera in memory.
pub struct MemorySink {
    records: Mutex<HashMap<CameraId, VecDeque<AnalysisRecord>>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Total records held across cameras.
    pub fn len(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CameraId, VecDeque<AnalysisRecord>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl AnalysisSink for MemorySink {
    async fn append(&self, record: &AnalysisRecord) -> StorageResult<()> {
        let mut records = self.lock();
        let entries = records.entry(record.camera_id().clone()).or_default();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(record.clone());
        Ok(())
    }

    async fn history(
        &self,
        camera_id: &CameraId,
        limit: usize,
    ) -> StorageResult<Vec<AnalysisRecord>> {
        Ok(self
            .lock()
            .get(camera_id)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
