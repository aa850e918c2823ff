//! Detection overlays for saved frames.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use coastwatch_models::PersonDetection;

use crate::frame::Frame;

/// Box colour for accepted person detections.
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Border thickness in pixels.
const BOX_THICKNESS: i32 = 2;

/// Render the frame with a hollow rectangle around each detection.
///
/// Boxes are clipped to the frame; degenerate boxes are drawn as 1x1.
pub fn annotate_detections(frame: &Frame, detections: &[PersonDetection]) -> RgbImage {
    let mut canvas = frame.image().to_rgb8();
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return canvas;
    }

    for detection in detections {
        let bbox = &detection.bbox;
        let x = (bbox.x.max(0.0) as u32).min(width - 1);
        let y = (bbox.y.max(0.0) as u32).min(height - 1);
        let w = (bbox.width.max(1.0) as u32).clamp(1, width - x);
        let h = (bbox.height.max(1.0) as u32).clamp(1, height - y);

        for inset in 0..BOX_THICKNESS {
            let (iw, ih) = (w as i32 - 2 * inset, h as i32 - 2 * inset);
            if iw <= 0 || ih <= 0 {
                break;
            }
            let rect = Rect::at(x as i32 + inset, y as i32 + inset).of_size(iw as u32, ih as u32);
            draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use coastwatch_models::BoundingBox;
    use image::{GrayImage, Luma};

    fn black_frame() -> Frame {
        Frame::from_gray(GrayImage::from_pixel(50, 40, Luma([0])))
    }

    #[test]
    fn test_draws_box_border() {
        let detection = PersonDetection::person(BoundingBox::new(10.0, 5.0, 20.0, 15.0), 0.9);
        let out = annotate_detections(&black_frame(), &[detection]);

        assert_eq!(out.dimensions(), (50, 40));
        assert_eq!(*out.get_pixel(10, 5), BOX_COLOR);
        assert_eq!(*out.get_pixel(29, 19), BOX_COLOR);
        // interior untouched
        assert_eq!(*out.get_pixel(20, 12), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_box_is_clipped() {
        let detection = PersonDetection::person(BoundingBox::new(45.0, 35.0, 100.0, 100.0), 0.9);
        let out = annotate_detections(&black_frame(), &[detection]);
        assert_eq!(*out.get_pixel(49, 39), BOX_COLOR);
    }

    #[test]
    fn test_no_detections_returns_plain_copy() {
        let out = annotate_detections(&black_frame(), &[]);
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
