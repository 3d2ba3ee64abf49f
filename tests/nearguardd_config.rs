use std::sync::Mutex;

use tempfile::NamedTempFile;

use nearguard::distance::ProximityZone;
use nearguard::NearguardConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "NEARGUARD_CONFIG",
        "NEARGUARD_CAMERA_URL",
        "NEARGUARD_DETECTOR_BACKEND",
        "NEARGUARD_DEPTH_BACKEND",
        "NEARGUARD_CALIBRATION_K",
        "NEARGUARD_SPEECH_PROGRAM",
        "NEARGUARD_LABEL_FILTER",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "url": "http://camera-1:81/stream",
            "target_fps": 12,
            "width": 800,
            "height": 600
        },
        "detector": {
            "backend": "stub",
            "confidence_threshold": 0.5
        },
        "depth": {
            "backend": "stub",
            "input_width": 128,
            "input_height": 128
        },
        "distance": {
            "calibration_k": 1.2
        },
        "feedback": {
            "program": "say",
            "queue_capacity": 4,
            "min_zone": "nearby"
        },
        "overlay": {
            "enabled": false,
            "snapshot_path": "/tmp/nearguard-latest.jpg"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("NEARGUARD_CONFIG", file.path());
    std::env::set_var("NEARGUARD_CAMERA_URL", "stub://override");
    std::env::set_var("NEARGUARD_CALIBRATION_K", "0.9");
    std::env::set_var("NEARGUARD_LABEL_FILTER", "^(person|dog)$");

    let cfg = NearguardConfig::load().expect("load config");

    assert_eq!(cfg.camera.url, "stub://override");
    assert_eq!(cfg.camera.target_fps, 12);
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.detector.backend, "stub");
    assert!((cfg.detector.confidence_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(cfg.depth.input_width, 128);
    assert!((cfg.calibration_k - 0.9).abs() < f32::EPSILON);
    assert_eq!(cfg.feedback.program, "say");
    assert_eq!(cfg.feedback.queue_capacity, 4);
    assert_eq!(cfg.feedback.min_zone, ProximityZone::Nearby);
    assert!(cfg.feedback.label_filter.is_some());
    assert!(!cfg.overlay.enabled);
    assert_eq!(
        cfg.overlay.snapshot_path.as_deref(),
        Some(std::path::Path::new("/tmp/nearguard-latest.jpg"))
    );

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = NearguardConfig::load().expect("load default config");

    assert_eq!(cfg.camera.url, "stub://camera");
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.depth.backend, "stub");
    assert!((cfg.calibration_k - 0.8).abs() < f32::EPSILON);
    assert!(cfg.feedback.enabled);
    assert_eq!(cfg.feedback.program, "espeak");
    assert_eq!(cfg.feedback.min_zone, ProximityZone::FarAway);
    assert!(cfg.feedback.label_filter.is_none());
    assert!(cfg.overlay.enabled);
    assert!(cfg.overlay.snapshot_path.is_none());
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "distance": { "calibration_k": -0.5 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("NEARGUARD_CONFIG", file.path());

    assert!(NearguardConfig::load().is_err());

    clear_env();
}

#[test]
fn bad_label_filter_regex_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("NEARGUARD_LABEL_FILTER", "(unclosed");
    assert!(NearguardConfig::load().is_err());

    clear_env();
}
