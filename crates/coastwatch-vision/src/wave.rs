//! Wave intensity scoring.
//!
//! Each frame is converted to grayscale and downscaled, then three
//! independent 0-10 signals are computed on the small frame:
//!
//! | Signal | Measure | Scaling |
//! |--------|---------|---------|
//! | motion | share of pixels whose difference to the previous frame exceeds a threshold | `ratio * 100` |
//! | edge | share of Canny edge pixels | `ratio * 50` |
//! | pattern | variance of the centred log-magnitude spectrum window | `variance / 1000` |
//!
//! The signals are fused with fixed weights and appended to a rolling
//! history whose mean is reported as the smoothed intensity.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::edges::canny;
use serde::{Deserialize, Serialize};
use tracing::debug;

use coastwatch_models::{round2, WaveLevel, WaveScore};

use crate::error::{VisionError, VisionResult};
use crate::frame::Frame;
use crate::history::{IntensityHistory, DEFAULT_HISTORY_WINDOW};
use crate::spectrum::SpectrumAnalyzer;

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 10.0;

/// Tuning parameters for wave scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveScorerConfig {
    /// Downscale factor applied to both axes before analysis
    pub scale_factor: f64,
    /// Minimum absolute pixel difference counted as motion (0-255)
    pub motion_threshold: u8,
    /// Canny hysteresis thresholds
    pub canny_low: f32,
    pub canny_high: f32,
    /// Number of intensities kept for the rolling average
    pub history_window: usize,
    /// Fusion weights
    pub motion_weight: f64,
    pub edge_weight: f64,
    pub pattern_weight: f64,
}

impl Default for WaveScorerConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.5,
            motion_threshold: 30,
            canny_low: 50.0,
            canny_high: 150.0,
            history_window: DEFAULT_HISTORY_WINDOW,
            motion_weight: 0.4,
            edge_weight: 0.3,
            pattern_weight: 0.3,
        }
    }
}

impl WaveScorerConfig {
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn validate(&self) -> VisionResult<()> {
        if !(self.scale_factor > 0.0 && self.scale_factor <= 1.0) {
            return Err(VisionError::invalid_config(format!(
                "scale_factor must be in (0, 1], got {}",
                self.scale_factor
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(VisionError::invalid_config(
                "canny_low must not exceed canny_high",
            ));
        }
        if self.history_window == 0 {
            return Err(VisionError::invalid_config("history_window must be positive"));
        }
        let weights = [self.motion_weight, self.edge_weight, self.pattern_weight];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(VisionError::invalid_config("fusion weights must be non-negative"));
        }
        Ok(())
    }
}

/// Per-camera wave scorer.
///
/// Holds the previous downscaled frame for motion and the rolling
/// intensity history; one instance must be used per camera.
pub struct WaveIntensityScorer {
    config: WaveScorerConfig,
    prev_frame: Option<GrayImage>,
    history: IntensityHistory,
    spectrum: SpectrumAnalyzer,
    frames_scored: u64,
}

impl WaveIntensityScorer {
    pub fn new(config: WaveScorerConfig) -> Self {
        let history = IntensityHistory::new(config.history_window);
        Self {
            config,
            prev_frame: None,
            history,
            spectrum: SpectrumAnalyzer::new(),
            frames_scored: 0,
        }
    }

    /// Score one frame.
    ///
    /// Fails only for frames with zero area.
    pub fn score(&mut self, frame: &Frame) -> VisionResult<WaveScore> {
        frame.validate()?;

        let small = self.downscale(&frame.to_gray());

        let motion = self.motion_score(&small);
        let edge = self.edge_score(&small);
        let pattern = self.pattern_score(&small);
        let intensity = self.fuse(motion, edge, pattern);

        self.history.push(intensity);
        let average = self.history.mean().unwrap_or(intensity);
        self.frames_scored += 1;

        let level = WaveLevel::from_intensity(intensity);
        debug!(
            motion,
            edge,
            pattern,
            intensity,
            average,
            level = level.name(),
            "Wave frame scored"
        );

        Ok(WaveScore {
            current_intensity: round2(intensity),
            average_intensity: round2(average),
            motion_score: round2(motion),
            edge_score: round2(edge),
            pattern_score: round2(pattern),
            level,
            description: level.description().to_string(),
        })
    }

    /// Forget the previous frame and the intensity history.
    pub fn reset(&mut self) {
        self.prev_frame = None;
        self.history.clear();
    }

    pub fn config(&self) -> &WaveScorerConfig {
        &self.config
    }

    pub fn history(&self) -> &IntensityHistory {
        &self.history
    }

    pub fn frames_scored(&self) -> u64 {
        self.frames_scored
    }

    fn downscale(&self, gray: &GrayImage) -> GrayImage {
        let width = ((gray.width() as f64 * self.config.scale_factor) as u32).max(1);
        let height = ((gray.height() as f64 * self.config.scale_factor) as u32).max(1);
        if (width, height) == gray.dimensions() {
            return gray.clone();
        }
        imageops::resize(gray, width, height, FilterType::Triangle)
    }

    /// Share of changed pixels against the previous frame.
    ///
    /// The first frame, or a frame whose size differs from the previous one,
    /// scores 0. The current frame always becomes the new reference.
    fn motion_score(&mut self, small: &GrayImage) -> f64 {
        let score = match self.prev_frame.as_ref() {
            Some(prev) if prev.dimensions() == small.dimensions() => {
                let threshold = self.config.motion_threshold;
                let moving = prev
                    .as_raw()
                    .iter()
                    .zip(small.as_raw())
                    .filter(|(a, b)| a.abs_diff(**b) > threshold)
                    .count();
                let ratio = moving as f64 / small.as_raw().len() as f64;
                (ratio * 100.0).min(MAX_SCORE)
            }
            _ => 0.0,
        };
        self.prev_frame = Some(small.clone());
        score
    }

    /// Share of Canny edge pixels.
    fn edge_score(&self, small: &GrayImage) -> f64 {
        let edges = canny(small, self.config.canny_low, self.config.canny_high);
        let edge_pixels = edges.as_raw().iter().filter(|&&p| p > 0).count();
        let ratio = edge_pixels as f64 / edges.as_raw().len() as f64;
        (ratio * 50.0).min(MAX_SCORE)
    }

    /// Mid-frequency texture from the log-magnitude spectrum.
    fn pattern_score(&mut self, small: &GrayImage) -> f64 {
        let variance = self.spectrum.window_variance(small);
        (variance / 1000.0).min(MAX_SCORE)
    }

    fn fuse(&self, motion: f64, edge: f64, pattern: f64) -> f64 {
        let total = motion * self.config.motion_weight
            + edge * self.config.edge_weight
            + pattern * self.config.pattern_weight;
        total.min(MAX_SCORE)
    }
}

impl Default for WaveIntensityScorer {
    fn default() -> Self {
        Self::new(WaveScorerConfig::default())
    }
}
