//! Frequency-domain texture measure for sea-surface roughness.
//!
//! The frame is transformed with a 2D FFT (rows, then columns), the
//! zero-frequency term is shifted to the centre, and the log-magnitude
//! spectrum `ln(|F| + 1)` is sampled over a window of half the height and
//! half the width centred on the spectrum centre. The population variance of
//! that window is the raw texture measure.

use std::sync::Arc;

use image::GrayImage;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// 2D spectrum analyser with cached FFT plans.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Variance of the centred log-magnitude window.
    ///
    /// Returns 0 for an empty image.
    pub fn window_variance(&mut self, image: &GrayImage) -> f64 {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width == 0 || height == 0 {
            return 0.0;
        }

        let spectrum = self.fft2(image);

        let (cy, cx) = (height / 2, width / 2);
        let y0 = cy.saturating_sub(height / 4);
        let y1 = (cy + height / 4).min(height);
        let x0 = cx.saturating_sub(width / 4);
        let x1 = (cx + width / 4).min(width);

        let mut window = Vec::with_capacity((y1 - y0) * (x1 - x0));
        for sy in y0..y1 {
            let y = unshift(sy, height);
            for sx in x0..x1 {
                let x = unshift(sx, width);
                window.push((spectrum[y * width + x].norm() + 1.0).ln());
            }
        }

        variance(&window)
    }

    /// Row-major 2D forward FFT of the image intensities.
    fn fft2(&mut self, image: &GrayImage) -> Vec<Complex<f64>> {
        let (width, height) = (image.width() as usize, image.height() as usize);

        let mut data: Vec<Complex<f64>> = image
            .as_raw()
            .iter()
            .map(|&p| Complex::new(p as f64, 0.0))
            .collect();

        // Rows are contiguous, so one call transforms all of them.
        let row_fft: Arc<dyn Fft<f64>> = self.planner.plan_fft_forward(width);
        row_fft.process(&mut data);

        let col_fft: Arc<dyn Fft<f64>> = self.planner.plan_fft_forward(height);
        let mut transposed = transpose(&data, width, height);
        col_fft.process(&mut transposed);

        transpose(&transposed, height, width)
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a centre-shifted index back to its unshifted FFT bin.
fn unshift(shifted: usize, n: usize) -> usize {
    (shifted + n - n / 2) % n
}

/// Transpose a row-major `width x height` matrix.
fn transpose(data: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_unshift_matches_fftshift() {
        // fftshift of [0,1,2,3] is [2,3,0,1]
        let even: Vec<usize> = (0..4).map(|i| unshift(i, 4)).collect();
        assert_eq!(even, vec![2, 3, 0, 1]);
        // fftshift of [0,1,2,3,4] is [3,4,0,1,2]
        let odd: Vec<usize> = (0..5).map(|i| unshift(i, 5)).collect();
        assert_eq!(odd, vec![3, 4, 0, 1, 2]);
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[2.0, 2.0, 2.0]), 0.0);
        assert!((variance(&[1.0, 2.0, 3.0, 4.0]) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_fft_of_constant_image_has_only_dc() {
        let image = GrayImage::from_pixel(8, 4, Luma([10]));
        let mut analyzer = SpectrumAnalyzer::new();
        let spectrum = analyzer.fft2(&image);

        assert!((spectrum[0].re - 320.0).abs() < 1e-9);
        assert!(spectrum[1..].iter().all(|c| c.norm() < 1e-9));
    }

    #[test]
    fn test_textured_image_has_more_variance_than_flat() {
        let flat = GrayImage::from_pixel(32, 32, Luma([128]));
        let textured = GrayImage::from_fn(32, 32, |x, y| {
            Luma([if (x / 2 + y / 3) % 2 == 0 { 20 } else { 235 }])
        });

        let mut analyzer = SpectrumAnalyzer::new();
        let flat_var = analyzer.window_variance(&flat);
        let textured_var = analyzer.window_variance(&textured);

        assert!(flat_var >= 0.0);
        assert!(textured_var > flat_var);
    }

    #[test]
    fn test_single_pixel_image() {
        let image = GrayImage::from_pixel(1, 1, Luma([200]));
        let mut analyzer = SpectrumAnalyzer::new();
        assert_eq!(analyzer.window_variance(&image), 0.0);
    }
}
