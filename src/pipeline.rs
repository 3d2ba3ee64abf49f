//! Per-frame processing pipeline.
//!
//! A [`Pipeline`] owns the detector, the depth backend, and the distance
//! estimator, and turns each frame into a list of [`ProximityWarning`]s.
//! All state is explicit; two pipelines with different backends can run
//! side by side in one process.

use anyhow::{Context, Result};

use crate::depth::DepthBackend;
use crate::detect::{Detection, DetectorBackend};
use crate::distance::{DistanceEstimate, DistanceEstimator, ProximityZone};
use crate::frame::Frame;

/// One detected object with its estimated distance.
#[derive(Clone, Debug)]
pub struct ProximityWarning {
    pub detection: Detection,
    pub estimate: DistanceEstimate,
}

impl ProximityWarning {
    pub fn zone(&self) -> ProximityZone {
        self.estimate.zone()
    }

    /// Spoken-form warning, e.g. `person very close, 0.80 meters`.
    pub fn message(&self) -> String {
        match self.estimate {
            DistanceEstimate::Meters(meters) => format!(
                "{} {}, {:.2} meters",
                self.detection.label,
                self.zone().phrase(),
                meters
            ),
            DistanceEstimate::Undefined => format!(
                "{} {}, distance unknown",
                self.detection.label,
                self.zone().phrase()
            ),
        }
    }
}

pub struct Pipeline {
    detector: Box<dyn DetectorBackend>,
    depth: Box<dyn DepthBackend>,
    estimator: DistanceEstimator,
}

impl Pipeline {
    pub fn new(
        detector: Box<dyn DetectorBackend>,
        depth: Box<dyn DepthBackend>,
        estimator: DistanceEstimator,
    ) -> Self {
        Self {
            detector,
            depth,
            estimator,
        }
    }

    /// Run any lazy backend initialization up front, so the first real
    /// frame is not charged for model loading.
    pub fn warm_up(&mut self) -> Result<()> {
        self.detector
            .warm_up()
            .with_context(|| format!("detector backend '{}' warm-up failed", self.detector.name()))?;
        self.depth
            .warm_up()
            .with_context(|| format!("depth backend '{}' warm-up failed", self.depth.name()))?;
        Ok(())
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn depth_name(&self) -> &'static str {
        self.depth.name()
    }

    /// Process one frame: detect objects, infer depth, estimate a distance
    /// per detection. Depth inference is skipped entirely when the frame
    /// has no detections.
    pub fn process(&mut self, frame: &Frame) -> Result<Vec<ProximityWarning>> {
        let detections = self
            .detector
            .detect(&frame.pixels, frame.width, frame.height)
            .context("object detection failed")?;
        if detections.is_empty() {
            return Ok(Vec::new());
        }

        let depth = self
            .depth
            .infer(&frame.pixels, frame.width, frame.height)
            .context("depth inference failed")?;

        let mut warnings = Vec::with_capacity(detections.len());
        for detection in detections {
            let estimate =
                self.estimator
                    .estimate(&depth, &detection.bbox, frame.width, frame.height)?;
            warnings.push(ProximityWarning { detection, estimate });
        }
        Ok(warnings)
    }
}
