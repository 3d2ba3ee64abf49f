//! Monocular distance estimation and proximity classification.
//!
//! This is the core of the crate: a bounding box plus a relative depth
//! surface becomes an approximate distance in meters and a discrete
//! proximity zone. The estimator is a pure function of its inputs; it never
//! touches the camera, the models, or the feedback path.
//!
//! Distances are only relatively meaningful. The calibration constant ties
//! inverse normalized depth to meters without any knowledge of camera
//! intrinsics, so two estimates from the same camera compare sensibly but
//! the absolute numbers do not transfer between cameras.

use anyhow::{anyhow, Result};
use std::fmt;

use crate::depth::DepthSurface;
use crate::detect::BoundingBox;

/// Default calibration constant. Tunable, not a physical constant.
pub const DEFAULT_CALIBRATION: f32 = 0.8;

/// Distances below this are announced as "very close" (meters).
pub const VERY_CLOSE_M: f32 = 1.0;

/// Distances below this (and at least [`VERY_CLOSE_M`]) are "nearby" (meters).
pub const NEARBY_M: f32 = 3.0;

/// Discrete classification of an estimated distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProximityZone {
    VeryClose,
    Nearby,
    FarAway,
}

impl ProximityZone {
    /// Classify a distance in meters. Boundaries are half-open: exactly
    /// 1.0 m is Nearby, exactly 3.0 m is FarAway.
    pub fn from_meters(meters: f32) -> Self {
        if meters < VERY_CLOSE_M {
            ProximityZone::VeryClose
        } else if meters < NEARBY_M {
            ProximityZone::Nearby
        } else {
            ProximityZone::FarAway
        }
    }

    /// Spoken-feedback phrase for this zone.
    pub fn phrase(&self) -> &'static str {
        match self {
            ProximityZone::VeryClose => "very close",
            ProximityZone::Nearby => "nearby",
            ProximityZone::FarAway => "far away",
        }
    }
}

impl fmt::Display for ProximityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Outcome of a distance estimation.
///
/// `Undefined` is the sentinel for a zero depth sample: the surface claims
/// the point is infinitely far, which classifies as [`ProximityZone::FarAway`]
/// and is not an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DistanceEstimate {
    Meters(f32),
    Undefined,
}

impl DistanceEstimate {
    pub fn meters(&self) -> Option<f32> {
        match self {
            DistanceEstimate::Meters(m) => Some(*m),
            DistanceEstimate::Undefined => None,
        }
    }

    pub fn zone(&self) -> ProximityZone {
        match self {
            DistanceEstimate::Meters(m) => ProximityZone::from_meters(*m),
            DistanceEstimate::Undefined => ProximityZone::FarAway,
        }
    }
}

impl fmt::Display for DistanceEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceEstimate::Meters(m) => write!(f, "{:.2}m", m),
            DistanceEstimate::Undefined => f.write_str("far"),
        }
    }
}

/// Maps bounding boxes into depth-surface space and converts depth samples
/// to distances.
#[derive(Clone, Copy, Debug)]
pub struct DistanceEstimator {
    calibration: f32,
}

impl DistanceEstimator {
    /// Create an estimator with the given calibration constant (`k > 0`).
    pub fn new(calibration: f32) -> Result<Self> {
        if !calibration.is_finite() || calibration <= 0.0 {
            return Err(anyhow!(
                "calibration constant must be a positive finite number, got {}",
                calibration
            ));
        }
        Ok(Self { calibration })
    }

    pub fn calibration(&self) -> f32 {
        self.calibration
    }

    /// Estimate the distance to the object behind `bbox`.
    ///
    /// The bounding box center is mapped from frame-pixel coordinates into
    /// depth-surface coordinates and clamped into the grid, so boxes centered
    /// at or beyond the frame edge sample the nearest edge cell instead of
    /// reading out of bounds. A zero depth sample yields
    /// [`DistanceEstimate::Undefined`].
    ///
    /// Fails only on malformed frame dimensions; a well-formed call never
    /// panics and never divides by zero.
    pub fn estimate(
        &self,
        depth: &DepthSurface,
        bbox: &BoundingBox,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<DistanceEstimate> {
        if frame_width == 0 || frame_height == 0 {
            return Err(anyhow!(
                "frame dimensions must be non-zero, got {}x{}",
                frame_width,
                frame_height
            ));
        }

        let scale_x = depth.width() as f32 / frame_width as f32;
        let scale_y = depth.height() as f32 / frame_height as f32;

        let x = clamp_index(bbox.cx * scale_x, depth.width());
        let y = clamp_index(bbox.cy * scale_y, depth.height());

        // In-bounds by construction of the clamped indices.
        let depth_value = depth.get(x, y).ok_or_else(|| {
            anyhow!("depth sample ({}, {}) out of range after clamping", x, y)
        })?;

        if depth_value > 0.0 {
            Ok(DistanceEstimate::Meters(self.calibration / depth_value))
        } else {
            Ok(DistanceEstimate::Undefined)
        }
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self {
            calibration: DEFAULT_CALIBRATION,
        }
    }
}

/// Floor a scaled coordinate and clamp it into `[0, len - 1]`.
fn clamp_index(scaled: f32, len: usize) -> usize {
    let floored = scaled.floor();
    if !(floored > 0.0) {
        return 0;
    }
    (floored as usize).min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_surface(value: f32, width: usize, height: usize) -> DepthSurface {
        DepthSurface::from_normalized(vec![value; width * height], width, height).unwrap()
    }

    fn centered_box(cx: f32, cy: f32) -> BoundingBox {
        BoundingBox::new(cx, cy, 10.0, 10.0).unwrap()
    }

    #[test]
    fn estimate_is_k_over_depth() {
        let est = DistanceEstimator::new(0.8).unwrap();
        let surface = uniform_surface(0.4, 32, 24);
        let d = est
            .estimate(&surface, &centered_box(320.0, 240.0), 640, 480)
            .unwrap();
        assert_eq!(d, DistanceEstimate::Meters(2.0));
    }

    #[test]
    fn estimate_decreases_as_depth_increases() {
        let est = DistanceEstimator::new(0.8).unwrap();
        let bbox = centered_box(320.0, 240.0);
        let mut last = f32::INFINITY;
        for depth_value in [0.1, 0.25, 0.5, 0.75, 1.0] {
            let surface = uniform_surface(depth_value, 32, 24);
            let meters = est
                .estimate(&surface, &bbox, 640, 480)
                .unwrap()
                .meters()
                .unwrap();
            assert!(meters < last, "{} not < {}", meters, last);
            last = meters;
        }
    }

    #[test]
    fn zero_depth_is_undefined_and_far_away() {
        let est = DistanceEstimator::default();
        let surface = uniform_surface(0.0, 16, 16);
        let d = est
            .estimate(&surface, &centered_box(100.0, 100.0), 640, 480)
            .unwrap();
        assert_eq!(d, DistanceEstimate::Undefined);
        assert_eq!(d.zone(), ProximityZone::FarAway);
    }

    #[test]
    fn zone_boundaries_are_half_open() {
        assert_eq!(ProximityZone::from_meters(0.99), ProximityZone::VeryClose);
        assert_eq!(ProximityZone::from_meters(1.0), ProximityZone::Nearby);
        assert_eq!(ProximityZone::from_meters(2.99), ProximityZone::Nearby);
        assert_eq!(ProximityZone::from_meters(3.0), ProximityZone::FarAway);
    }

    #[test]
    fn spec_scenario_240x320_surface() {
        // 320x240 depth grid against a 640x480 frame, all cells 0.5, k = 0.8.
        // Center (320, 240) maps to (160, 120); distance 1.6 m, Nearby.
        let est = DistanceEstimator::new(0.8).unwrap();
        let surface = uniform_surface(0.5, 320, 240);
        let d = est
            .estimate(&surface, &centered_box(320.0, 240.0), 640, 480)
            .unwrap();
        let meters = d.meters().unwrap();
        assert!((meters - 1.6).abs() < 1e-6);
        assert_eq!(d.zone(), ProximityZone::Nearby);
    }

    #[test]
    fn corner_center_clamps_to_last_cell() {
        let est = DistanceEstimator::default();
        let mut data = vec![0.5f32; 8 * 6];
        // Mark the bottom-right cell so we can prove it was sampled.
        data[8 * 6 - 1] = 0.25;
        let surface = DepthSurface::from_normalized(data, 8, 6).unwrap();

        // Center exactly at the bottom-right frame corner.
        let d = est
            .estimate(&surface, &centered_box(640.0, 480.0), 640, 480)
            .unwrap();
        assert_eq!(d.meters().unwrap(), DEFAULT_CALIBRATION / 0.25);
    }

    #[test]
    fn centers_beyond_frame_clamp_instead_of_failing() {
        let est = DistanceEstimator::default();
        let surface = uniform_surface(0.5, 8, 6);
        for (cx, cy) in [(-50.0, -50.0), (10_000.0, 10_000.0), (-1.0, 480.0)] {
            let d = est.estimate(&surface, &centered_box(cx, cy), 640, 480);
            assert!(d.is_ok(), "center ({}, {}) should clamp", cx, cy);
        }
    }

    #[test]
    fn zero_frame_dimensions_are_rejected() {
        let est = DistanceEstimator::default();
        let surface = uniform_surface(0.5, 8, 6);
        let bbox = centered_box(10.0, 10.0);
        assert!(est.estimate(&surface, &bbox, 0, 480).is_err());
        assert!(est.estimate(&surface, &bbox, 640, 0).is_err());
    }

    #[test]
    fn estimate_is_deterministic() {
        let est = DistanceEstimator::new(1.2).unwrap();
        let surface = uniform_surface(0.3, 40, 30);
        let bbox = centered_box(123.0, 77.0);
        let first = est.estimate(&surface, &bbox, 640, 480).unwrap();
        let second = est.estimate(&surface, &bbox, 640, 480).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn calibration_must_be_positive() {
        assert!(DistanceEstimator::new(0.0).is_err());
        assert!(DistanceEstimator::new(-1.0).is_err());
        assert!(DistanceEstimator::new(f32::NAN).is_err());
        assert!(DistanceEstimator::new(0.8).is_ok());
    }
}
