//! demo - end-to-end synthetic run of the proximity warning pipeline

use anyhow::{anyhow, Result};
use clap::Parser;

use nearguard::{
    CameraConfig, CameraSource, DistanceEstimator, FeedbackDispatcher, Pipeline, RecordingSpeech,
    StubDepthBackend, StubDetector,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to process.
    #[arg(long, default_value_t = 50)]
    frames: u32,
    /// Frame width for the synthetic camera.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Frame height for the synthetic camera.
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Calibration constant tying inverse depth to meters.
    #[arg(long, default_value_t = 0.8)]
    calibration: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }

    let mut source = CameraSource::new(CameraConfig {
        url: "stub://demo".to_string(),
        target_fps: 0,
        width: args.width,
        height: args.height,
    })?;
    source.connect()?;

    let mut pipeline = Pipeline::new(
        Box::new(StubDetector::new()),
        Box::new(StubDepthBackend::default()),
        DistanceEstimator::new(args.calibration)?,
    );
    pipeline.warm_up()?;

    let speech = RecordingSpeech::new();
    let mut dispatcher = FeedbackDispatcher::start(Box::new(speech.clone()), 8)?;

    for frame_idx in 0..args.frames {
        let frame = source.next_frame()?;
        let warnings = pipeline.process(&frame)?;
        for warning in &warnings {
            println!("frame {:>4}: {}", frame_idx, warning.message());
            dispatcher.dispatch(&warning.message());
        }
    }

    dispatcher.shutdown();
    println!(
        "processed {} frames, voiced {} warnings (latest-wins queue)",
        source.stats().frames_captured,
        speech.spoken().len()
    );
    Ok(())
}
