//! Frame ingestion sources.
//!
//! Sources produce [`Frame`](crate::frame::Frame) instances for the
//! processing loop:
//! - `stub://` synthetic frames (tests, demos)
//! - `http(s)://` IP cameras serving MJPEG multipart streams or single-JPEG
//!   snapshot endpoints
//!
//! The ingestion layer decodes frames in memory, decimates to a target
//! frame rate, and reports health/statistics. A failed read surfaces as an
//! error so the caller's loop can terminate and release the source.

mod camera;
mod http;

pub use camera::{CameraConfig, CameraSource, CameraStats};
