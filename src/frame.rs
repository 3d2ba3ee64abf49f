//! Camera frame container.
//!
//! Frames are ephemeral: produced by an ingest source, processed by the
//! pipeline, annotated, then dropped. Nothing in the crate retains a frame
//! across loop iterations.

use anyhow::{anyhow, Result};

/// A single RGB8 camera frame in original (unscaled) pixel coordinates.
///
/// The pixel buffer is tightly packed, row-major, 3 bytes per pixel.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Build a frame, rejecting dimension/buffer mismatches.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }
}
