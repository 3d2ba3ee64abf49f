//! Nearguard
//!
//! This crate implements a monocular proximity warning pipeline: frames
//! from a webcam or IP camera are run through an object detector and a
//! relative depth estimator, each detection gets an approximate distance
//! in meters, and warnings are voiced through a text-to-speech command.
//!
//! # Architecture
//!
//! Each frame flows through a fixed sequence:
//!
//! 1. **Ingest**: a camera source decodes one RGB frame.
//! 2. **Detect**: a detector backend finds labeled bounding boxes.
//! 3. **Depth**: a depth backend produces a normalized depth surface.
//! 4. **Distance**: each box center is sampled against the surface and
//!    converted to meters with a calibration constant.
//! 5. **Feedback**: warnings are queued to a bounded, latest-wins speech
//!    dispatcher and optionally drawn back onto the frame.
//!
//! All state is owned by explicit values; there are no globals, so
//! multiple pipelines can coexist in one process.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (synthetic, HTTP MJPEG/snapshot)
//! - `detect`: detection records and detector backends
//! - `depth`: depth surfaces and depth backends
//! - `distance`: the distance estimator and proximity zones
//! - `pipeline`: per-frame orchestration
//! - `feedback`: spoken warning dispatch
//! - `overlay`: frame annotation

pub mod config;
pub mod depth;
pub mod detect;
pub mod distance;
pub mod feedback;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod pipeline;

pub use config::NearguardConfig;
pub use depth::{build_depth, DepthBackend, DepthSurface, StubDepthBackend};
#[cfg(feature = "backend-tract")]
pub use depth::TractDepthBackend;
pub use detect::{build_detector, BoundingBox, Detection, DetectorBackend, StubDetector};
#[cfg(feature = "backend-tract")]
pub use detect::TractDetector;
pub use distance::{DistanceEstimate, DistanceEstimator, ProximityZone};
pub use feedback::{CommandSpeech, FeedbackDispatcher, NullSpeech, RecordingSpeech, SpeechEngine};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, CameraStats};
pub use overlay::Overlay;
pub use pipeline::{Pipeline, ProximityWarning};
