//! Frame annotation.
//!
//! Draws proximity warnings back onto the frame: a hollow box per
//! detection, colored by zone, with an optional caption when a TrueType
//! font is configured. Annotation mutates the frame's pixel buffer
//! in-place.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::distance::ProximityZone;
use crate::frame::Frame;
use crate::pipeline::ProximityWarning;

const CAPTION_SCALE: f32 = 16.0;

pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    /// Overlay with boxes only, no captions.
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Load a TrueType font for captions.
    pub fn with_font<P: AsRef<Path>>(font_path: P) -> Result<Self> {
        let font_path = font_path.as_ref();
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("failed to read font file {}", font_path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow!("{} is not a usable font file", font_path.display()))?;
        Ok(Self { font: Some(font) })
    }

    /// Draw every warning onto the frame.
    pub fn annotate(&self, frame: &mut Frame, warnings: &[ProximityWarning]) -> Result<()> {
        // Rebuild the image over the frame's own buffer; written back below.
        let mut img: RgbImage =
            ImageBuffer::from_raw(frame.width, frame.height, std::mem::take(&mut frame.pixels))
                .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;

        for warning in warnings {
            let color = zone_color(warning.zone());
            let bbox = warning.detection.bbox;

            let left = bbox.left().max(0.0) as i32;
            let top = bbox.top().max(0.0) as i32;
            let right = (bbox.right().min(frame.width as f32)) as i32;
            let bottom = (bbox.bottom().min(frame.height as f32)) as i32;
            let w = (right - left).max(1) as u32;
            let h = (bottom - top).max(1) as u32;

            draw_hollow_rect_mut(&mut img, Rect::at(left, top).of_size(w, h), color);

            if let Some(font) = &self.font {
                let caption = caption_for(warning);
                let text_x = left.max(2);
                let text_y = (top - CAPTION_SCALE as i32 - 2).max(2);
                draw_text_mut(
                    &mut img,
                    color,
                    text_x,
                    text_y,
                    PxScale::from(CAPTION_SCALE),
                    font,
                    &caption,
                );
            }
        }

        frame.pixels = img.into_raw();
        Ok(())
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the frame as a JPEG at `path`, replacing any previous snapshot.
///
/// This is the daemon's sink for annotated frames: an external viewer can
/// poll the file, so the overlay work has a consumer even without a window.
pub fn write_snapshot(frame: &Frame, path: &Path) -> Result<()> {
    let img: RgbImage =
        ImageBuffer::from_raw(frame.width, frame.height, frame.pixels.clone())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
    img.save(path)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    Ok(())
}

fn zone_color(zone: ProximityZone) -> Rgb<u8> {
    match zone {
        ProximityZone::VeryClose => Rgb([220, 40, 40]),
        ProximityZone::Nearby => Rgb([230, 170, 30]),
        ProximityZone::FarAway => Rgb([60, 200, 80]),
    }
}

fn caption_for(warning: &ProximityWarning) -> String {
    format!(
        "{} ({}) {}",
        warning.detection.label,
        warning.zone().phrase(),
        warning.estimate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};
    use crate::distance::DistanceEstimate;

    fn warning(cx: f32, cy: f32, meters: f32) -> ProximityWarning {
        ProximityWarning {
            detection: Detection::new(
                BoundingBox::new(cx, cy, 40.0, 60.0).unwrap(),
                "person",
                0.9,
            ),
            estimate: DistanceEstimate::Meters(meters),
        }
    }

    #[test]
    fn annotate_changes_pixels_under_the_box() -> Result<()> {
        let mut frame = Frame::new(vec![0u8; 320 * 240 * 3], 320, 240)?;
        Overlay::new().annotate(&mut frame, &[warning(160.0, 120.0, 0.5)])?;

        assert!(frame.pixels.iter().any(|&p| p != 0));
        assert_eq!(frame.pixels.len(), 320 * 240 * 3);
        Ok(())
    }

    #[test]
    fn annotate_with_no_warnings_leaves_the_frame_untouched() -> Result<()> {
        let pixels = vec![7u8; 64 * 48 * 3];
        let mut frame = Frame::new(pixels.clone(), 64, 48)?;
        Overlay::new().annotate(&mut frame, &[])?;
        assert_eq!(frame.pixels, pixels);
        Ok(())
    }

    #[test]
    fn boxes_partially_outside_the_frame_are_clipped() -> Result<()> {
        let mut frame = Frame::new(vec![0u8; 64 * 48 * 3], 64, 48)?;
        // Center close to the corner pushes the box edges off-frame.
        Overlay::new().annotate(&mut frame, &[warning(2.0, 2.0, 0.5)])?;
        Ok(())
    }

    #[test]
    fn snapshots_round_trip_through_jpeg() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("latest.jpg");

        let mut frame = Frame::new(vec![40u8; 64 * 48 * 3], 64, 48)?;
        Overlay::new().annotate(&mut frame, &[warning(32.0, 24.0, 0.5)])?;
        write_snapshot(&frame, &path)?;

        let written = std::fs::metadata(&path)?;
        assert!(written.len() > 0);
        Ok(())
    }

    #[test]
    fn captions_include_label_zone_and_distance() {
        let text = caption_for(&warning(100.0, 100.0, 0.5));
        assert_eq!(text, "person (very close) 0.50m");
    }
}
