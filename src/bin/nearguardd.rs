//! nearguardd - proximity warning daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured camera source
//! 2. Runs object detection and relative depth estimation per frame
//! 3. Converts each detection into a distance estimate and proximity zone
//! 4. Queues warnings to the bounded speech dispatcher (latest wins)
//! 5. Optionally annotates frames and writes them to a JPEG snapshot
//!    file that an external viewer can poll

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nearguard::overlay::write_snapshot;
use nearguard::{
    build_depth, build_detector, CameraConfig, CameraSource, CommandSpeech, DistanceEstimator,
    FeedbackDispatcher, NearguardConfig, NullSpeech, Overlay, Pipeline, SpeechEngine,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = NearguardConfig::load().context("failed to load configuration")?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        flag.store(false, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    let detector = build_detector(&cfg.detector)?;
    let depth = build_depth(&cfg.depth)?;
    let estimator = DistanceEstimator::new(cfg.calibration_k)?;
    let mut pipeline = Pipeline::new(detector, depth, estimator);
    pipeline.warm_up()?;

    let engine: Box<dyn SpeechEngine> = if cfg.feedback.enabled {
        Box::new(CommandSpeech::new(cfg.feedback.program.clone()))
    } else {
        Box::new(NullSpeech)
    };
    let mut dispatcher = FeedbackDispatcher::start(engine, cfg.feedback.queue_capacity)?;

    // Annotation only happens when there is somewhere to put the result.
    let snapshot_path = cfg.overlay.snapshot_path.clone().filter(|_| cfg.overlay.enabled);
    let overlay = match (&snapshot_path, cfg.overlay.font_path.as_ref()) {
        (Some(_), Some(path)) => Some(Overlay::with_font(path)?),
        (Some(_), None) => Some(Overlay::new()),
        (None, _) => None,
    };

    let mut source = CameraSource::new(CameraConfig {
        url: cfg.camera.url.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;
    source.connect()?;

    log::info!(
        "nearguardd running. camera={} detector={} depth={} k={}",
        cfg.camera.url,
        pipeline.detector_name(),
        pipeline.depth_name(),
        cfg.calibration_k
    );

    let mut last_health_log = Instant::now();
    let mut last_snapshot = Instant::now();
    let mut warning_count = 0u64;

    while running.load(Ordering::SeqCst) {
        let mut frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("camera read failed, stopping: {:#}", e);
                break;
            }
        };

        let warnings = match pipeline.process(&frame) {
            Ok(warnings) => warnings,
            Err(e) => {
                log::warn!("frame processing failed: {:#}", e);
                continue;
            }
        };

        for warning in &warnings {
            warning_count += 1;
            log::info!(
                "warning #{}: {} conf={:.2} zone={}",
                warning_count,
                warning.message(),
                warning.detection.confidence,
                warning.zone()
            );
            if cfg
                .feedback
                .should_announce(&warning.detection.label, warning.zone())
            {
                dispatcher.dispatch(&warning.message());
            }
        }

        if let (Some(overlay), Some(path)) = (&overlay, &snapshot_path) {
            if last_snapshot.elapsed() >= Duration::from_secs(1) {
                let result = overlay
                    .annotate(&mut frame, &warnings)
                    .and_then(|_| write_snapshot(&frame, path));
                if let Err(e) = result {
                    log::warn!("snapshot failed: {:#}", e);
                }
                last_snapshot = Instant::now();
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "camera health={} frames={} source={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.source
            );
            last_health_log = Instant::now();
        }
    }

    log::info!("nearguardd stopping after {} warnings", warning_count);
    dispatcher.shutdown();
    Ok(())
}
