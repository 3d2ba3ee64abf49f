use anyhow::Result;

use crate::detect::result::Detection;

/// Object detector backend.
///
/// Implementations must treat the pixel slice as read-only and ephemeral:
/// no retention across calls, no writes to disk, no network I/O during
/// `detect`. Detections come back in original-frame pixel coordinates.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB8 frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
