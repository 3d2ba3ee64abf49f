//! Relative depth surfaces and depth estimation backends.
//!
//! A depth backend receives RGB pixels and produces a [`DepthSurface`]: a
//! dense grid of normalized closeness values. Surface dimensions are
//! independent of the source frame; the distance estimator handles the
//! coordinate mapping.
//!
//! Depth values are relative and unit-less. Higher means closer. There is
//! no guaranteed scale, which is why the distance estimator needs a
//! calibration constant.

mod backends;

pub use backends::StubDepthBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractDepthBackend;

use anyhow::{anyhow, Result};

use crate::config::DepthSettings;

/// Construct the depth backend named by the configuration.
pub fn build_depth(settings: &DepthSettings) -> Result<Box<dyn DepthBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubDepthBackend::default())),
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let model_path = settings
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow!("depth.model_path is required for tract"))?;
            let backend =
                TractDepthBackend::new(model_path, settings.input_width, settings.input_height)?;
            Ok(Box::new(backend))
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow!(
            "depth backend 'tract' requires the backend-tract feature"
        )),
        other => Err(anyhow!("unknown depth backend '{}'", other)),
    }
}

/// Dense 2-D grid of relative depth values, each finite and in `[0, 1]`.
///
/// Dimensions are non-zero by construction, so a surface can always be
/// sampled after index clamping.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthSurface {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl DepthSurface {
    /// Build a surface from already-normalized values.
    ///
    /// Rejects zero dimensions, shape mismatches, and any cell outside
    /// `[0, 1]` or non-finite.
    pub fn from_normalized(data: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("depth surface dimensions must be non-zero"));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| anyhow!("depth surface dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} depth cells for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite() || **v < 0.0 || **v > 1.0) {
            return Err(anyhow!("depth cell {} outside normalized range [0, 1]", bad));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Min-max normalize raw model output into a surface.
    ///
    /// The denominator carries a small epsilon so a degenerate surface where
    /// every cell is equal normalizes to all zeros instead of dividing by
    /// zero. All-zero cells classify as far away downstream.
    pub fn from_raw(raw: &[f32], width: usize, height: usize) -> Result<Self> {
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("raw depth output contains non-finite values"));
        }
        let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
        let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let range = max - min + 1e-6;
        let data = raw.iter().map(|v| ((v - min) / range).clamp(0.0, 1.0)).collect();
        Self::from_normalized(data, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample a cell. Returns `None` when the coordinates are out of range.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }
}

/// Depth estimation backend.
///
/// Implementations treat the pixel slice as read-only and ephemeral and
/// must not retain it across calls.
pub trait DepthBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Produce a depth surface for an RGB8 frame.
    fn infer(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DepthSurface>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_surface_validates_shape_and_range() {
        assert!(DepthSurface::from_normalized(vec![0.5; 6], 3, 2).is_ok());
        assert!(DepthSurface::from_normalized(vec![0.5; 5], 3, 2).is_err());
        assert!(DepthSurface::from_normalized(vec![1.5; 6], 3, 2).is_err());
        assert!(DepthSurface::from_normalized(vec![-0.1; 6], 3, 2).is_err());
        assert!(DepthSurface::from_normalized(vec![f32::NAN; 6], 3, 2).is_err());
        assert!(DepthSurface::from_normalized(Vec::new(), 0, 2).is_err());
    }

    #[test]
    fn from_raw_normalizes_to_unit_range() {
        let surface = DepthSurface::from_raw(&[10.0, 20.0, 30.0, 40.0], 2, 2).unwrap();
        assert_eq!(surface.get(0, 0), Some(0.0));
        let max = surface.get(1, 1).unwrap();
        assert!(max > 0.99 && max <= 1.0);
    }

    #[test]
    fn degenerate_raw_surface_becomes_all_zeros() {
        // All-equal input must not divide by zero; it flattens to zero depth.
        let surface = DepthSurface::from_raw(&[7.5; 4], 2, 2).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(surface.get(x, y), Some(0.0));
            }
        }
    }

    #[test]
    fn get_rejects_out_of_range() {
        let surface = DepthSurface::from_normalized(vec![0.5; 6], 3, 2).unwrap();
        assert!(surface.get(2, 1).is_some());
        assert!(surface.get(3, 1).is_none());
        assert!(surface.get(2, 2).is_none());
    }
}
