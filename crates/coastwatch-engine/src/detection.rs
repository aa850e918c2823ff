//! People detector selection.

use std::sync::Arc;

use tracing::{info, warn};

use coastwatch_vision::{PeopleDetector, UnavailableDetector};

use crate::config::EngineConfig;

/// Build the configured people detector.
///
/// Never fails: when no model is configured or it cannot be loaded, crowd
/// assessment degrades to the unknown level.
pub fn build_detector(config: &EngineConfig) -> Arc<dyn PeopleDetector> {
    let Some(model_path) = config.yolo_model_path.as_deref() else {
        info!("No detection model configured, crowd levels will be unknown");
        return Arc::new(UnavailableDetector::default());
    };
    load_model(model_path)
}

#[cfg(feature = "onnx")]
fn load_model(model_path: &str) -> Arc<dyn PeopleDetector> {
    use coastwatch_vision::{YoloConfig, YoloPersonDetector};

    let config = YoloConfig {
        model_path: model_path.to_string(),
        ..YoloConfig::default()
    };
    match YoloPersonDetector::new(config) {
        Ok(detector) => Arc::new(detector),
        Err(e) => {
            warn!(model_path, error = %e, "Person detector unavailable");
            Arc::new(UnavailableDetector::new(e.to_string()))
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn load_model(model_path: &str) -> Arc<dyn PeopleDetector> {
    warn!(model_path, "Built without the onnx feature, person detection disabled");
    Arc::new(UnavailableDetector::new("built without onnx support"))
}
