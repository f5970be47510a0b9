//! Manual/listening verification binary: opens the default input and output
//! devices and runs the pipeline for a configurable duration. Not part of
//! the library's public contract.

use audio_pipeline::{CpalCaptureStream, CpalPlaybackStream, PipelineConfig, PipelineOrchestrator};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Runs the full-duplex STFT audio pipeline against real devices")]
struct Args {
    /// How long to run before stopping, in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Frames per capture burst; must be a positive multiple of 3.
    #[arg(long, default_value_t = 288)]
    frames_per_burst: u32,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let capture = match CpalCaptureStream::default_device(args.frames_per_burst) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!("failed to open input device: {e}");
            std::process::exit(1);
        }
    };
    let playback = match CpalPlaybackStream::default_device(args.frames_per_burst) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!("failed to open output device: {e}");
            std::process::exit(1);
        }
    };

    let mut orchestrator = PipelineOrchestrator::new(PipelineConfig::default());
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));

    if !orchestrator.start() {
        tracing::error!("pipeline failed to start");
        std::process::exit(1);
    }

    tracing::info!("pipeline running for {} seconds", args.seconds);
    std::thread::sleep(Duration::from_secs(args.seconds));

    orchestrator.stop();
    tracing::info!("pipeline stopped");
}
