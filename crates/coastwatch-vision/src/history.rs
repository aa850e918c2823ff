//! Fixed-capacity rolling window of wave intensities.

use std::collections::VecDeque;

/// Default number of intensities kept per camera.
pub const DEFAULT_HISTORY_WINDOW: usize = 30;

/// FIFO window of the most recent intensities; the oldest entry is evicted
/// once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct IntensityHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl IntensityHistory {
    /// Create a window. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest when full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Arithmetic mean, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

impl Default for IntensityHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}
