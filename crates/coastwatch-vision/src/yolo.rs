//! YOLOv8 person detection through ONNX Runtime.
//!
//! Only class 0 (person) candidates are decoded; boxes are returned in
//! pixel coordinates of the source frame.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use coastwatch_models::{BoundingBox, PersonDetection};

use crate::crowd::PERSON_CLASS_ID;
use crate::detector::PeopleDetector;
use crate::error::DetectorError;
use crate::frame::Frame;

/// YOLOv8 output layout: 4 box values + 80 COCO class scores per candidate.
const NUM_CLASSES: usize = 80;
const NUM_FEATURES: usize = 4 + NUM_CLASSES;

#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Candidates below this score are discarded before NMS
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Square model input size
    pub input_size: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// Person detector backed by a YOLOv8 ONNX model.
pub struct YoloPersonDetector {
    session: Mutex<Session>,
    config: YoloConfig,
}

impl YoloPersonDetector {
    /// Load the model.
    ///
    /// A missing or unloadable model is reported as
    /// [`DetectorError::Unavailable`].
    pub fn new(config: YoloConfig) -> Result<Self, DetectorError> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(DetectorError::unavailable(format!(
                "model not found: {}",
                config.model_path
            )));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Person detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &YoloConfig {
        &self.config
    }

    /// Resize to the model input and lay out as normalised NCHW.
    fn preprocess(&self, frame: &Frame) -> Result<Value, DetectorError> {
        let size = self.config.input_size;
        let rgb = frame
            .image()
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        let side = size as usize;

        let mut chw: Vec<f32> = Vec::with_capacity(3 * side * side);
        for c in 0..3 {
            for pixel in rgb.pixels() {
                chw.push(pixel[c] as f32 / 255.0);
            }
        }

        Tensor::from_array((vec![1usize, 3, side, side], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| DetectorError::inference(format!("failed to create tensor: {e}")))
    }

    fn run_inference(&self, input: Value) -> Result<Vec<f32>, DetectorError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::inference("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectorError::inference(format!("inference failed: {e}")))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| DetectorError::inference("missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::inference(format!("failed to extract tensor: {e}")))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Decode `[1, 84, N]` output into person boxes in frame pixels.
    fn postprocess(
        &self,
        outputs: &[f32],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<PersonDetection>, DetectorError> {
        if outputs.is_empty() || outputs.len() % NUM_FEATURES != 0 {
            return Err(DetectorError::inference(format!(
                "unexpected output size {}",
                outputs.len()
            )));
        }
        let num_boxes = outputs.len() / NUM_FEATURES;

        let array = Array::from_shape_vec((NUM_FEATURES, num_boxes), outputs.to_vec())
            .map_err(|e| DetectorError::inference(format!("failed to reshape output: {e}")))?;
        let rows = array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = frame_width as f32 / input_size;
        let scale_h = frame_height as f32 / input_size;

        let mut candidates = Vec::new();
        for i in 0..num_boxes {
            let person_score = rows[[i, 4 + PERSON_CLASS_ID]];
            if person_score < self.config.confidence_threshold {
                continue;
            }

            // Skip candidates where another class wins.
            let best_other = (0..NUM_CLASSES)
                .filter(|&c| c != PERSON_CLASS_ID)
                .map(|c| rows[[i, 4 + c]])
                .fold(0.0f32, f32::max);
            if best_other > person_score {
                continue;
            }

            let (cx, cy, w, h) = (rows[[i, 0]], rows[[i, 1]], rows[[i, 2]], rows[[i, 3]]);
            let x1 = ((cx - w / 2.0) * scale_w).clamp(0.0, frame_width as f32);
            let y1 = ((cy - h / 2.0) * scale_h).clamp(0.0, frame_height as f32);
            let x2 = ((cx + w / 2.0) * scale_w).clamp(0.0, frame_width as f32);
            let y2 = ((cy + h / 2.0) * scale_h).clamp(0.0, frame_height as f32);

            candidates.push(PersonDetection::person(
                BoundingBox::from_corners(x1, y1, x2, y2),
                person_score,
            ));
        }

        Ok(non_maximum_suppression(candidates, self.config.nms_threshold))
    }
}

impl PeopleDetector for YoloPersonDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError> {
        let input = self.preprocess(frame)?;
        let outputs = self.run_inference(input)?;
        let detections = self.postprocess(&outputs, frame.width(), frame.height())?;
        debug!(count = detections.len(), "Person detection completed");
        Ok(detections)
    }

    fn name(&self) -> &str {
        "yolov8"
    }
}

/// Greedy NMS over confidence-sorted detections.
fn non_maximum_suppression(
    mut detections: Vec<PersonDetection>,
    threshold: f32,
) -> Vec<PersonDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<PersonDetection> = Vec::new();
    for candidate in detections {
        if keep.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= threshold) {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = (a.x2().min(b.x2()) - a.x.max(b.x)).max(0.0);
    let inter_h = (a.y2().min(b.y2()) - a.y.max(b.y)).max(0.0);
    let intersection = inter_w * inter_h;
    let union = a.area() + b.area() - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

fn create_session(model_path: &Path) -> Result<Session, DetectorError> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| DetectorError::unavailable(format!("failed to read model file: {e}")))?;

    Session::builder()
        .map_err(|e| DetectorError::unavailable(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DetectorError::unavailable(format!("failed to set optimization level: {e}")))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| DetectorError::unavailable(format!("failed to load ONNX model: {e}")))
}
