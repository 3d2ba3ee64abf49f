use anyhow::{anyhow, Result};

/// Axis-aligned bounding box in frame-pixel coordinates.
///
/// Boxes store their *center* plus width/height, matching the convention of
/// the detector outputs this crate consumes. Width and height are strictly
/// positive by construction; centers may fall outside the frame (the
/// distance estimator clamps during sampling).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(cx: f32, cy: f32, w: f32, h: f32) -> Result<Self> {
        if !(w > 0.0) || !(h > 0.0) {
            return Err(anyhow!(
                "bounding box dimensions must be positive, got {}x{}",
                w,
                h
            ));
        }
        if !cx.is_finite() || !cy.is_finite() || !w.is_finite() || !h.is_finite() {
            return Err(anyhow!("bounding box coordinates must be finite"));
        }
        Ok(Self { cx, cy, w, h })
    }

    /// Build from a top-left origin plus extent.
    pub fn from_top_left(x: f32, y: f32, w: f32, h: f32) -> Result<Self> {
        Self::new(x + w / 2.0, y + h / 2.0, w, h)
    }

    pub fn left(&self) -> f32 {
        self.cx - self.w / 2.0
    }

    pub fn top(&self) -> f32 {
        self.cy - self.h / 2.0
    }

    pub fn right(&self) -> f32 {
        self.cx + self.w / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.cy + self.h / 2.0
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let iy = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// A single detection: box, class label, and confidence. Per-frame lifecycle.
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }
}
