//! In-memory latest-result cache with a bounded per-camera history.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use coastwatch_models::{AnalysisResult, CameraId};

/// Latest result and recent history per camera.
///
/// Serves reads without touching durable storage and is the fallback
/// history when the sink cannot be read.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<CameraId, VecDeque<AnalysisResult>>>,
    capacity: usize,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, result: AnalysisResult) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let history = entries.entry(result.camera_id.clone()).or_default();
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(result);
    }

    pub fn latest(&self, camera_id: &CameraId) -> Option<AnalysisResult> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .and_then(|h| h.back().cloned())
    }

    /// Up to `limit` results, newest first.
    pub fn history(&self, camera_id: &CameraId, limit: usize) -> Vec<AnalysisResult> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .map(|h| h.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_latest(&self) -> Vec<AnalysisResult> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut latest: Vec<AnalysisResult> =
            entries.values().filter_map(|h| h.back().cloned()).collect();
        latest.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        latest
    }

    pub fn has_result(&self, camera_id: &CameraId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .is_some_and(|h| !h.is_empty())
    }

    pub fn remove(&self, camera_id: &CameraId) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(camera_id);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coastwatch_models::{CrowdScore, WaveLevel, WaveScore};

    fn result(camera: &str, intensity: f64) -> AnalysisResult {
        AnalysisResult {
            camera_id: CameraId::new(camera),
            timestamp: Utc::now(),
            wave: WaveScore {
                current_intensity: intensity,
                average_intensity: intensity,
                motion_score: 0.0,
                edge_score: 0.0,
                pattern_score: 0.0,
                level: WaveLevel::from_intensity(intensity),
                description: String::new(),
            },
            crowd: CrowdScore::unknown(),
            frame_width: 10,
            frame_height: 10,
            processing_time: 0.01,
        }
    }

    #[test]
    fn test_latest_and_bounded_history() {
        let cache = ResultCache::new(3);
        for i in 0..5 {
            cache.record(result("a", i as f64));
        }

        let id = CameraId::new("a");
        assert_eq!(cache.latest(&id).unwrap().wave.current_intensity, 4.0);
        let history: Vec<f64> = cache
            .history(&id, 10)
            .iter()
            .map(|r| r.wave.current_intensity)
            .collect();
        assert_eq!(history, vec![4.0, 3.0, 2.0]);
        assert_eq!(cache.history(&id, 1).len(), 1);
    }

    #[test]
    fn test_all_latest_and_remove() {
        let cache = ResultCache::new(10);
        cache.record(result("b", 1.0));
        cache.record(result("a", 2.0));
        cache.record(result("a", 3.0));

        let latest = cache.all_latest();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].camera_id.as_str(), "a");
        assert_eq!(latest[0].wave.current_intensity, 3.0);

        cache.remove(&CameraId::new("a"));
        assert!(!cache.has_result(&CameraId::new("a")));
        assert!(cache.has_result(&CameraId::new("b")));
    }
}
