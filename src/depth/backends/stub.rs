use anyhow::Result;

use crate::depth::{DepthBackend, DepthSurface};

/// Stub depth backend for tests and demos.
///
/// Produces a vertical gradient: the bottom of the scene reads as close,
/// the top as distant, roughly matching how a ground-plane camera sees the
/// world. `with_uniform` pins every cell to one value for deterministic
/// distance tests.
pub struct StubDepthBackend {
    grid_width: usize,
    grid_height: usize,
    uniform: Option<f32>,
}

impl StubDepthBackend {
    pub fn new(grid_width: usize, grid_height: usize) -> Self {
        Self {
            grid_width: grid_width.max(1),
            grid_height: grid_height.max(1),
            uniform: None,
        }
    }

    /// Emit a flat surface with every cell set to `value` (clamped to [0, 1]).
    pub fn with_uniform(mut self, value: f32) -> Self {
        self.uniform = Some(value.clamp(0.0, 1.0));
        self
    }
}

impl Default for StubDepthBackend {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

impl DepthBackend for StubDepthBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DepthSurface> {
        if let Some(value) = self.uniform {
            return DepthSurface::from_normalized(
                vec![value; self.grid_width * self.grid_height],
                self.grid_width,
                self.grid_height,
            );
        }

        let mut data = Vec::with_capacity(self.grid_width * self.grid_height);
        for y in 0..self.grid_height {
            // Rows near the bottom are closer. Keep a floor above zero so the
            // gradient never produces the "undefined" sentinel by accident.
            let closeness = 0.05 + 0.9 * (y as f32 / (self.grid_height - 1).max(1) as f32);
            for _ in 0..self.grid_width {
                data.push(closeness);
            }
        }
        DepthSurface::from_normalized(data, self.grid_width, self.grid_height)
    }
}
