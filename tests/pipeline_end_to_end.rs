//! End-to-end pipeline scenarios driven entirely by in-memory fakes: no
//! real audio device is touched.

mod support;

use audio_pipeline::{PipelineConfig, PipelineOrchestrator};
use std::f32::consts::PI;
use std::time::Duration;
use support::{ExhaustionBehavior, FakeCaptureStream, FakePlaybackStream};

const CHANNELS: u16 = 2;
const SAMPLE_RATE: u32 = 48_000;
const FPB: u32 = 288;

fn stereo_sine(freq_hz: f32, amplitude: f32, sample_rate: u32, total_frames: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; total_frames * CHANNELS as usize];
    for i in 0..total_frames {
        let sample = amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin();
        out[i * 2] = sample;
        out[i * 2 + 1] = sample;
    }
    out
}

/// Least-squares fit of `a*sin(wn) + b*cos(wn)` against `samples`, returning
/// `(amplitude, residual_rms, fundamental_rms)`.
fn fit_sine_amplitude_and_residual(samples: &[f32], freq_hz: f32, sample_rate: u32) -> (f32, f64, f64) {
    let w = 2.0 * PI * freq_hz / sample_rate as f32;
    let n = samples.len();

    let mut sum_sin_sq = 0.0f64;
    let mut sum_cos_sq = 0.0f64;
    let mut sum_x_sin = 0.0f64;
    let mut sum_x_cos = 0.0f64;
    for (i, &x) in samples.iter().enumerate() {
        let phase = w * i as f32;
        let s = phase.sin() as f64;
        let c = phase.cos() as f64;
        sum_sin_sq += s * s;
        sum_cos_sq += c * c;
        sum_x_sin += x as f64 * s;
        sum_x_cos += x as f64 * c;
    }
    let a = sum_x_sin / sum_sin_sq.max(1e-12);
    let b = sum_x_cos / sum_cos_sq.max(1e-12);
    let amplitude = ((a * a + b * b) as f32).sqrt();

    let mut residual_sq = 0.0f64;
    let mut fundamental_sq = 0.0f64;
    for (i, &x) in samples.iter().enumerate() {
        let phase = w * i as f32;
        let fitted = a * phase.sin() as f64 + b * phase.cos() as f64;
        let residual = x as f64 - fitted;
        residual_sq += residual * residual;
        fundamental_sq += fitted * fitted;
    }

    (
        amplitude,
        (residual_sq / n as f64).sqrt(),
        (fundamental_sq / n as f64).sqrt(),
    )
}

#[test]
fn silence_in_silence_out_after_warm_up() {
    let total_frames = SAMPLE_RATE as usize;
    let capture = FakeCaptureStream::silence(CHANNELS, FPB, SAMPLE_RATE, total_frames);
    let (playback, handle) = FakePlaybackStream::new(CHANNELS, FPB, SAMPLE_RATE);

    let config = PipelineConfig::default();
    let mut orchestrator = PipelineOrchestrator::new(config);
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));
    assert!(orchestrator.start());

    std::thread::sleep(Duration::from_millis(400));

    let mut buf = vec![0.0f32; FPB as usize * CHANNELS as usize];
    let pulled = handle.pull(&mut buf, FPB as usize);
    assert_eq!(pulled, FPB as usize);
    for sample in &buf {
        assert!(sample.abs() <= 1e-6, "expected near-silence, got {sample}");
    }
    assert_eq!(orchestrator.counters().underflows(), 0);

    orchestrator.stop();
}

#[test]
fn sine_preservation_within_amplitude_and_distortion_tolerance() {
    let freq = 440.0f32;
    let amplitude = 0.5f32;
    let total_frames = SAMPLE_RATE as usize * 2;
    let data = stereo_sine(freq, amplitude, SAMPLE_RATE, total_frames);

    let capture = FakeCaptureStream::new(CHANNELS, FPB, SAMPLE_RATE, data);
    let (playback, handle) = FakePlaybackStream::new(CHANNELS, FPB, SAMPLE_RATE);

    let mut config = PipelineConfig::default();
    config.warm_up = Duration::from_millis(0);
    let mut orchestrator = PipelineOrchestrator::new(config);
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));
    assert!(orchestrator.start());

    std::thread::sleep(Duration::from_millis(600));

    let pull_frames = 8192usize;
    let mut buf = vec![0.0f32; pull_frames * CHANNELS as usize];
    let pulled = handle.pull(&mut buf, pull_frames);
    orchestrator.stop();
    assert!(pulled >= pull_frames / 2, "pipeline produced too little output");

    let left: Vec<f32> = buf[..pulled * CHANNELS as usize]
        .chunks(CHANNELS as usize)
        .map(|frame| frame[0])
        .collect();

    // Discard the pipeline's own warm-up/group-delay region (spec.md §9).
    let warm_up = 1024.min(left.len() / 2);
    let analysis = &left[warm_up..];

    let (measured_amplitude, residual_rms, fundamental_rms) =
        fit_sine_amplitude_and_residual(analysis, freq, SAMPLE_RATE);

    let amplitude_error = (measured_amplitude - amplitude).abs() / amplitude;
    assert!(
        amplitude_error <= 0.05,
        "amplitude drifted too far: measured {measured_amplitude}, expected {amplitude}"
    );

    let thd_db = 20.0 * (residual_rms / fundamental_rms.max(1e-12)).log10();
    assert!(thd_db <= -40.0, "distortion too high: {thd_db} dB");
}

#[test]
fn ratio_law_total_output_matches_total_input_within_one_burst() {
    let total_frames = SAMPLE_RATE as usize;
    let data = stereo_sine(440.0, 0.5, SAMPLE_RATE, total_frames);
    let capture = FakeCaptureStream::new(CHANNELS, FPB, SAMPLE_RATE, data)
        .with_exhaustion_behavior(ExhaustionBehavior::Stall);
    let (playback, handle) = FakePlaybackStream::new(CHANNELS, FPB, SAMPLE_RATE);

    let mut config = PipelineConfig::default();
    config.prefill_bursts = 0;
    let mut orchestrator = PipelineOrchestrator::new(config);
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));
    assert!(orchestrator.start());

    // The fake capture stream isn't rate-limited, so the processing thread
    // races through all of `total_frames` almost immediately.
    std::thread::sleep(Duration::from_millis(500));
    orchestrator.stop();

    let mut total_pulled = 0usize;
    let mut buf = vec![0.0f32; FPB as usize * CHANNELS as usize];
    loop {
        let pulled = handle.pull(&mut buf, FPB as usize);
        if pulled == 0 {
            break;
        }
        total_pulled += pulled;
        if total_pulled > total_frames + FPB as usize * 4 {
            break;
        }
    }

    let diff = (total_pulled as i64 - total_frames as i64).unsigned_abs() as usize;
    assert!(
        diff <= FPB as usize,
        "expected ~{total_frames} output frames, got {total_pulled}"
    );
}

#[test]
fn overflow_counting_when_playback_never_pulls() {
    let total_frames = SAMPLE_RATE as usize; // 1s of tone, more than enough to overflow
    let data = stereo_sine(440.0, 0.5, SAMPLE_RATE, total_frames);
    let capture = FakeCaptureStream::new(CHANNELS, FPB, SAMPLE_RATE, data);
    let (playback, _handle) = FakePlaybackStream::new(CHANNELS, FPB, SAMPLE_RATE);

    let mut config = PipelineConfig::default();
    config.prefill_bursts = 2;
    let mut orchestrator = PipelineOrchestrator::new(config);
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));
    assert!(orchestrator.start());

    // Never call handle.pull(): the output ring fills and further writes
    // must be dropped (counted), not deadlock the processing thread.
    std::thread::sleep(Duration::from_millis(300));

    assert!(orchestrator.counters().overflows() > 0);

    orchestrator.stop();
}

#[test]
fn clean_shutdown_completes_promptly() {
    let total_frames = SAMPLE_RATE as usize * 5;
    let capture = FakeCaptureStream::silence(CHANNELS, FPB, SAMPLE_RATE, total_frames);
    let (playback, _handle) = FakePlaybackStream::new(CHANNELS, FPB, SAMPLE_RATE);

    let mut orchestrator = PipelineOrchestrator::new(PipelineConfig::default());
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));
    assert!(orchestrator.start());

    std::thread::sleep(Duration::from_millis(50));

    let started = std::time::Instant::now();
    orchestrator.stop();
    let elapsed = started.elapsed();

    // The orchestrator's own capture read timeout bounds worst-case exit
    // latency; a generous multiple of it keeps this robust under load.
    assert!(
        elapsed <= Duration::from_millis(200),
        "stop() took too long: {elapsed:?}"
    );
}

#[test]
fn warm_up_suppresses_underflow_counting() {
    // An input stream that never delivers a frame keeps the output ring
    // permanently empty, so every pull is a controlled underflow.
    let capture = FakeCaptureStream::new(CHANNELS, FPB, SAMPLE_RATE, Vec::new())
        .with_exhaustion_behavior(ExhaustionBehavior::Stall);
    let (playback, handle) = FakePlaybackStream::new(CHANNELS, FPB, SAMPLE_RATE);

    let mut config = PipelineConfig::default();
    config.prefill_bursts = 0;
    config.warm_up = Duration::from_millis(300);
    let mut orchestrator = PipelineOrchestrator::new(config);
    orchestrator.set_input_stream(Box::new(capture));
    orchestrator.set_output_stream(Box::new(playback));
    assert!(orchestrator.start());

    let mut buf = vec![0.0f32; FPB as usize * CHANNELS as usize];
    handle.pull(&mut buf, FPB as usize);
    assert_eq!(
        orchestrator.counters().underflows(),
        0,
        "underflow must not be counted inside the warm-up window"
    );

    std::thread::sleep(Duration::from_millis(350));
    handle.pull(&mut buf, FPB as usize);
    orchestrator.stop();

    assert!(
        orchestrator.counters().underflows() >= FPB as u64,
        "underflow must be counted once the warm-up window has elapsed"
    );
}
