//! Decoded camera frame.

use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::error::{VisionError, VisionResult};

/// A fully decoded frame.
///
/// Cloning is cheap: the pixel data is shared and never mutated after
/// construction, so a reader always observes a complete image.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a decoded image, stamping it with the current time.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
            captured_at: Utc::now(),
        }
    }

    /// Build a single-channel frame.
    pub fn from_gray(image: GrayImage) -> Self {
        Self::new(DynamicImage::ImageLuma8(image))
    }

    /// Build a three-channel frame.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self::new(DynamicImage::ImageRgb8(image))
    }

    /// Decode a JPEG payload.
    pub fn from_jpeg(bytes: &[u8]) -> VisionResult<Self> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
        Ok(Self::new(image))
    }

    /// Encode as JPEG.
    pub fn to_jpeg(&self, quality: u8) -> VisionResult<Vec<u8>> {
        encode_jpeg(&self.image.to_rgb8(), quality)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel count.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Number of colour channels.
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Reject frames that cannot be scored.
    pub fn validate(&self) -> VisionResult<()> {
        if self.area() == 0 {
            return Err(VisionError::EmptyFrame {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    /// 8-bit grayscale view, converting only when the frame has colour.
    ///
    /// Colour frames are reduced with the sRGB/Rec.709 luma weights
    /// (0.2126, 0.7152, 0.0722) used by `image`, not the Rec.601 weights
    /// (0.299, 0.587, 0.114) of OpenCV-style BGR-to-gray conversion. Edge
    /// and variance scores on colour input therefore differ slightly from
    /// tooling built on the latter.
    pub fn to_gray(&self) -> GrayImage {
        match self.image.as_ref() {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => other.to_luma8(),
        }
    }
}

/// Encode an RGB image as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> VisionResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf.into_inner())
}
