use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::distance::{ProximityZone, DEFAULT_CALIBRATION};

const DEFAULT_CAMERA_URL: &str = "stub://camera";
const DEFAULT_CAMERA_FPS: u32 = 15;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_DETECTOR_BACKEND: &str = "stub";
const DEFAULT_DETECTOR_INPUT: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
const DEFAULT_DEPTH_BACKEND: &str = "stub";
const DEFAULT_DEPTH_INPUT: u32 = 256;
const DEFAULT_SPEECH_PROGRAM: &str = "espeak";
const DEFAULT_FEEDBACK_CAPACITY: usize = 8;

#[derive(Debug, Deserialize, Default)]
struct NearguardConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    depth: Option<DepthConfigFile>,
    distance: Option<DistanceConfigFile>,
    feedback: Option<FeedbackConfigFile>,
    overlay: Option<OverlayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DepthConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DistanceConfigFile {
    calibration_k: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct FeedbackConfigFile {
    enabled: Option<bool>,
    program: Option<String>,
    queue_capacity: Option<usize>,
    label_filter: Option<String>,
    min_zone: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    enabled: Option<bool>,
    font_path: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct NearguardConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub depth: DepthSettings,
    pub calibration_k: f32,
    pub feedback: FeedbackSettings,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct DepthSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct FeedbackSettings {
    pub enabled: bool,
    pub program: String,
    pub queue_capacity: usize,
    pub label_filter: Option<Regex>,
    pub min_zone: ProximityZone,
}

impl FeedbackSettings {
    /// Decide whether a warning is worth voicing.
    pub fn should_announce(&self, label: &str, zone: ProximityZone) -> bool {
        if !self.enabled {
            return false;
        }
        if severity(zone) < severity(self.min_zone) {
            return false;
        }
        match &self.label_filter {
            Some(filter) => filter.is_match(label),
            None => true,
        }
    }
}

fn severity(zone: ProximityZone) -> u8 {
    match zone {
        ProximityZone::VeryClose => 2,
        ProximityZone::Nearby => 1,
        ProximityZone::FarAway => 0,
    }
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub enabled: bool,
    pub font_path: Option<PathBuf>,
    /// When set, the daemon writes the latest annotated frame here as JPEG.
    pub snapshot_path: Option<PathBuf>,
}

impl NearguardConfig {
    /// Load from the JSON file named by `NEARGUARD_CONFIG` (if set), apply
    /// `NEARGUARD_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("NEARGUARD_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: NearguardConfigFile) -> Result<Self> {
        let camera = CameraSettings {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            model_path: file.detector.as_ref().and_then(|d| d.model_path.clone()),
            input_width: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_width)
                .unwrap_or(DEFAULT_DETECTOR_INPUT),
            input_height: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_height)
                .unwrap_or(DEFAULT_DETECTOR_INPUT),
            confidence_threshold: file
                .detector
                .as_ref()
                .and_then(|detector| detector.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
        };
        let depth = DepthSettings {
            backend: file
                .depth
                .as_ref()
                .and_then(|depth| depth.backend.clone())
                .unwrap_or_else(|| DEFAULT_DEPTH_BACKEND.to_string()),
            model_path: file.depth.as_ref().and_then(|d| d.model_path.clone()),
            input_width: file
                .depth
                .as_ref()
                .and_then(|depth| depth.input_width)
                .unwrap_or(DEFAULT_DEPTH_INPUT),
            input_height: file
                .depth
                .as_ref()
                .and_then(|depth| depth.input_height)
                .unwrap_or(DEFAULT_DEPTH_INPUT),
        };
        let calibration_k = file
            .distance
            .and_then(|distance| distance.calibration_k)
            .unwrap_or(DEFAULT_CALIBRATION);
        let feedback = FeedbackSettings {
            enabled: file
                .feedback
                .as_ref()
                .and_then(|feedback| feedback.enabled)
                .unwrap_or(true),
            program: file
                .feedback
                .as_ref()
                .and_then(|feedback| feedback.program.clone())
                .unwrap_or_else(|| DEFAULT_SPEECH_PROGRAM.to_string()),
            queue_capacity: file
                .feedback
                .as_ref()
                .and_then(|feedback| feedback.queue_capacity)
                .unwrap_or(DEFAULT_FEEDBACK_CAPACITY),
            label_filter: match file.feedback.as_ref().and_then(|f| f.label_filter.clone()) {
                Some(pattern) => Some(compile_label_filter(&pattern)?),
                None => None,
            },
            min_zone: match file.feedback.and_then(|feedback| feedback.min_zone) {
                Some(name) => parse_zone(&name)?,
                None => ProximityZone::FarAway,
            },
        };
        let overlay = OverlaySettings {
            enabled: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.enabled)
                .unwrap_or(true),
            font_path: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.font_path.clone()),
            snapshot_path: file.overlay.and_then(|overlay| overlay.snapshot_path),
        };
        Ok(Self {
            camera,
            detector,
            depth,
            calibration_k,
            feedback,
            overlay,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("NEARGUARD_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(backend) = std::env::var("NEARGUARD_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(backend) = std::env::var("NEARGUARD_DEPTH_BACKEND") {
            if !backend.trim().is_empty() {
                self.depth.backend = backend;
            }
        }
        if let Ok(k) = std::env::var("NEARGUARD_CALIBRATION_K") {
            let parsed: f32 = k
                .parse()
                .map_err(|_| anyhow!("NEARGUARD_CALIBRATION_K must be a number"))?;
            self.calibration_k = parsed;
        }
        if let Ok(program) = std::env::var("NEARGUARD_SPEECH_PROGRAM") {
            if !program.trim().is_empty() {
                self.feedback.program = program;
            }
        }
        if let Ok(pattern) = std::env::var("NEARGUARD_LABEL_FILTER") {
            if !pattern.trim().is_empty() {
                self.feedback.label_filter = Some(compile_label_filter(&pattern)?);
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be non-zero"));
        }
        if !(self.calibration_k > 0.0) || !self.calibration_k.is_finite() {
            return Err(anyhow!(
                "distance.calibration_k must be a positive finite number, got {}",
                self.calibration_k
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!(
                "detector.confidence_threshold must be between 0 and 1, got {}",
                self.detector.confidence_threshold
            ));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input dimensions must be non-zero"));
        }
        if self.depth.input_width == 0 || self.depth.input_height == 0 {
            return Err(anyhow!("depth input dimensions must be non-zero"));
        }
        validate_backend_name("detector", &self.detector.backend)?;
        validate_backend_name("depth", &self.depth.backend)?;
        if self.detector.backend == "tract" && self.detector.model_path.is_none() {
            return Err(anyhow!("detector.model_path is required for the tract backend"));
        }
        if self.depth.backend == "tract" && self.depth.model_path.is_none() {
            return Err(anyhow!("depth.model_path is required for the tract backend"));
        }
        if self.feedback.queue_capacity == 0 {
            return Err(anyhow!("feedback.queue_capacity must be at least 1"));
        }
        Ok(())
    }
}

fn validate_backend_name(section: &str, backend: &str) -> Result<()> {
    match backend {
        "stub" | "tract" => Ok(()),
        other => Err(anyhow!(
            "unknown {} backend '{}'; expected 'stub' or 'tract'",
            section,
            other
        )),
    }
}

fn compile_label_filter(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| anyhow!("invalid feedback.label_filter regex: {}", e))
}

fn parse_zone(name: &str) -> Result<ProximityZone> {
    match name.trim().to_lowercase().as_str() {
        "very_close" | "very close" => Ok(ProximityZone::VeryClose),
        "nearby" => Ok(ProximityZone::Nearby),
        "far_away" | "far away" => Ok(ProximityZone::FarAway),
        other => Err(anyhow!(
            "unknown zone '{}'; expected very_close, nearby, or far_away",
            other
        )),
    }
}

fn read_config_file(path: &Path) -> Result<NearguardConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
