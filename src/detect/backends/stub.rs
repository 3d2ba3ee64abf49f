use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Stub detector for tests and demos.
///
/// Emits one synthetic "person" detection whose center drifts horizontally
/// across the frame, bouncing at the edges. Deterministic given the same
/// call sequence, so demos and tests see a box that actually moves through
/// different depth regions.
pub struct StubDetector {
    frame_count: u64,
    label: String,
}

impl StubDetector {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            label: "person".to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        self.frame_count += 1;

        let w = width as f32;
        let h = height as f32;

        // Triangle wave across the frame width, 200 frames per sweep.
        let phase = (self.frame_count % 200) as f32 / 200.0;
        let sweep = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };

        let bbox = BoundingBox::new(
            w * (0.1 + 0.8 * sweep),
            h * 0.6,
            w * 0.15,
            h * 0.4,
        )?;

        Ok(vec![Detection::new(bbox, self.label.clone(), 0.9)])
    }
}
