#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::depth::{DepthBackend, DepthSurface};

/// Tract-based monocular depth backend.
///
/// Loads a MiDaS-style ONNX model with a fixed input geometry. Frames are
/// resized to the model input, and the raw output grid is min-max
/// normalized into a [`DepthSurface`]. The backend performs no network I/O
/// and no disk writes beyond model loading.
pub struct TractDepthBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: u32,
    input_height: u32,
}

impl TractDepthBackend {
    /// Load an ONNX depth model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| {
                format!("failed to load ONNX depth model from {}", model_path.display())
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set depth model input fact")?
            .into_optimized()
            .context("failed to optimize depth model")?
            .into_runnable()
            .context("failed to build runnable depth model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
        })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let resized = resize_rgb(
            pixels,
            width as usize,
            height as usize,
            self.input_width as usize,
            self.input_height as usize,
        );

        let input_width = self.input_width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, input_width),
            |(_, channel, y, x)| {
                let idx = (y * input_width + x) * 3 + channel;
                resized[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }
}

impl DepthBackend for TractDepthBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DepthSurface> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("depth inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("depth model produced no outputs"))?;
        let grid = output
            .to_array_view::<f32>()
            .context("depth model output tensor was not f32")?;

        // Accept [1, H, W], [1, 1, H, W], or [H, W] output layouts.
        let dims: Vec<usize> = grid
            .shape()
            .iter()
            .copied()
            .filter(|d| *d > 1)
            .collect();
        let (grid_height, grid_width) = match dims.as_slice() {
            [h, w] => (*h, *w),
            _ => {
                return Err(anyhow!(
                    "unexpected depth output shape {:?}; expected a 2-D grid",
                    grid.shape()
                ))
            }
        };

        let raw: Vec<f32> = grid.iter().copied().collect();
        DepthSurface::from_raw(&raw, grid_width, grid_height)
    }
}

/// Nearest-neighbor RGB resize. Depth models are tolerant of resampling
/// artifacts, so the cheap kernel is sufficient here.
fn resize_rgb(
    pixels: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    if src_w == dst_w && src_h == dst_h {
        return pixels.to_vec();
    }
    let mut out = vec![0u8; dst_w * dst_h * 3];
    for y in 0..dst_h {
        let sy = y * src_h / dst_h;
        for x in 0..dst_w {
            let sx = x * src_w / dst_w;
            let src = (sy * src_w + sx) * 3;
            let dst = (y * dst_w + x) * 3;
            out[dst..dst + 3].copy_from_slice(&pixels[src..src + 3]);
        }
    }
    out
}
