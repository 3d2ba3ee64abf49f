//! Object detection types and backends.
//!
//! Detections are per-frame values: a labeled, confidence-scored bounding
//! box in original-frame pixel coordinates. They are produced by a
//! [`DetectorBackend`], consumed by the distance estimator and the overlay,
//! and discarded after the frame is rendered.

mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubDetector;
#[cfg(feature = "backend-tract")]
pub use backends::TractDetector;
pub use result::{BoundingBox, Detection};

use anyhow::Result;

use crate::config::DetectorSettings;

/// Construct the detector backend named by the configuration.
pub fn build_detector(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubDetector::new())),
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let model_path = settings
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("detector.model_path is required for tract"))?;
            let detector =
                TractDetector::new(model_path, settings.input_width, settings.input_height)?
                    .with_threshold(settings.confidence_threshold);
            Ok(Box::new(detector))
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow::anyhow!(
            "detector backend 'tract' requires the backend-tract feature"
        )),
        other => Err(anyhow::anyhow!("unknown detector backend '{}'", other)),
    }
}
