//! Pipeline orchestrator: owns the end-to-end dataflow, the processing
//! thread, and every scratch buffer (spec.md §4.4). Grounded on the
//! dev-server's `AudioServer`/`startup_wiring` split: device negotiation and
//! lifecycle live here, the per-burst DSP chain lives in `processing`.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, StreamRole};
use crate::pipeline::device::{CaptureStream, PlaybackStream};
use crate::pipeline::diagnostics::{Counters, DiagnosticsSlot};
use crate::pipeline::playback_bridge::PlaybackBridge;
use crate::pipeline::processing::ProcessingState;
use crate::ring::spsc_ring;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const CAPTURE_READ_TIMEOUT: Duration = Duration::from_millis(10);
const DIAGNOSTIC_INTERVAL: Duration = Duration::from_secs(1);
const DIAGNOSTIC_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    input_stream: Option<Box<dyn CaptureStream>>,
    output_stream: Option<Box<dyn PlaybackStream>>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    diagnostics: Arc<DiagnosticsSlot>,
    thread: Option<JoinHandle<Box<dyn CaptureStream>>>,
    diagnostics_thread: Option<JoinHandle<()>>,
    playback_bridge: Option<Arc<PlaybackBridge>>,
}

impl PipelineOrchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            input_stream: None,
            output_stream: None,
            running: Arc::new(AtomicBool::new(false)),
            counters: Counters::new(),
            diagnostics: DiagnosticsSlot::new(),
            thread: None,
            diagnostics_thread: None,
            playback_bridge: None,
        }
    }

    pub fn set_input_stream(&mut self, stream: Box<dyn CaptureStream>) {
        self.input_stream = Some(stream);
    }

    pub fn set_output_stream(&mut self, stream: Box<dyn PlaybackStream>) {
        self.output_stream = Some(stream);
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    /// Pulls up to `num_frames` stereo frames from the output ring into
    /// `out`, zero-filling any shortfall (spec.md §6). This is the same
    /// bridge a real device binding's bound callback calls into; exposed
    /// here too for hosts and tests that want to pull directly without
    /// going through a `PlaybackStream` impl. Returns `num_frames` (or 0
    /// if `start()` has not been called yet).
    pub fn pull_to(&self, out: &mut [f32], num_frames: usize) -> usize {
        match &self.playback_bridge {
            Some(bridge) => bridge.pull_to(out, num_frames),
            None => 0,
        }
    }

    /// Starts capture, processing and playback. Returns `false` (and logs
    /// why via `tracing::error!`) on any configuration or stream-start
    /// failure; never panics and never spawns a thread on failure.
    pub fn start(&mut self) -> bool {
        let Some(mut input) = self.input_stream.take() else {
            tracing::error!("{}", PipelineError::NoInputStream);
            return false;
        };
        if self.output_stream.is_none() {
            tracing::error!("{}", PipelineError::NoOutputStream);
            self.input_stream = Some(input);
            return false;
        }

        let output_ref = self.output_stream.as_ref().expect("checked above");
        let channels = output_ref.channel_count();
        let fpb = output_ref.frames_per_burst();
        let sample_rate = output_ref.sample_rate();

        if let Err(detail) = self.config.validate_frames_per_burst(fpb) {
            tracing::error!("{}", PipelineError::InvalidStreamParameters { detail });
            self.input_stream = Some(input);
            return false;
        }
        if channels != self.config.channels {
            tracing::error!(
                "{}",
                PipelineError::InvalidStreamParameters {
                    detail: format!(
                        "expected {} channels, got {channels}",
                        self.config.channels
                    )
                }
            );
            self.input_stream = Some(input);
            return false;
        }

        let stereo_ring_capacity = (sample_rate / self.config.ring_headroom_denominator) as usize;
        let mono_ring_capacity = (sample_rate / (self.config.ring_headroom_denominator * 3)) as usize;

        let Some((in_prod, in_cons)) = spsc_ring(stereo_ring_capacity, channels as usize) else {
            tracing::error!("failed to allocate input ring");
            self.input_stream = Some(input);
            return false;
        };
        let Some((mut out_prod, out_cons)) = spsc_ring(stereo_ring_capacity, channels as usize)
        else {
            tracing::error!("failed to allocate output ring");
            self.input_stream = Some(input);
            return false;
        };
        let Some((mono_prod, mono_cons)) = spsc_ring(mono_ring_capacity, 1) else {
            tracing::error!("failed to allocate mono ring");
            self.input_stream = Some(input);
            return false;
        };

        let prefill_frames =
            ((self.config.prefill_bursts as usize) * fpb as usize).min(stereo_ring_capacity);
        let silence = vec![0.0f32; prefill_frames * channels as usize];
        out_prod.write_interleaved(&silence, prefill_frames);

        let bridge = Arc::new(PlaybackBridge::new(
            out_cons,
            Arc::clone(&self.counters),
            self.config.warm_up,
        ));
        self.playback_bridge = Some(Arc::clone(&bridge));

        let output = self.output_stream.as_mut().expect("checked above");
        output.bind_callback(Box::new(move |data: &mut [f32], num_frames: usize| {
            bridge.pull_to(data, num_frames)
        }));

        if let Err(source) = input.request_start() {
            tracing::error!(
                "{}",
                PipelineError::StreamStart {
                    stream: StreamRole::Input,
                    source: source.0,
                }
            );
            self.input_stream = Some(input);
            return false;
        }

        if let Err(source) = self
            .output_stream
            .as_mut()
            .expect("checked above")
            .request_start()
        {
            let _ = input.request_stop();
            tracing::error!(
                "{}",
                PipelineError::StreamStart {
                    stream: StreamRole::Output,
                    source: source.0,
                }
            );
            return false;
        }

        self.running.store(true, Ordering::Release);

        let running = Arc::clone(&self.running);
        let counters = Arc::clone(&self.counters);
        let diagnostics = Arc::clone(&self.diagnostics);
        let fpb_usize = fpb as usize;
        let channels_usize = channels as usize;

        let handle = std::thread::spawn(move || {
            let mut state = ProcessingState::new(
                channels_usize,
                fpb_usize,
                in_prod,
                in_cons,
                out_prod,
                mono_prod,
                mono_cons,
                counters,
            );

            let mut last_diag = Instant::now();
            let mut last_hops = 0u64;

            while running.load(Ordering::Acquire) {
                let outcome = {
                    let buf = state.tmp_in_buf();
                    input.read(buf, fpb_usize, CAPTURE_READ_TIMEOUT)
                };
                if outcome.frames_read == 0 {
                    continue;
                }

                state.ingest_capture(outcome.frames_read);
                state.drain_ready_bursts();

                // Hot-path diagnostics: a handful of atomic stores, never a
                // log call (which would format/allocate and, with a real
                // subscriber installed, contend on I/O). The diagnostics
                // thread reads this slot back and does the actual logging.
                if last_diag.elapsed() >= DIAGNOSTIC_INTERVAL {
                    let hops = state.stft.hops_processed();
                    diagnostics.store(
                        state.in_cons.available_to_read(),
                        state.out_prod.available_to_read(),
                        hops,
                        hops - last_hops,
                        state.stft.frames_pushed(),
                        state.stft.frames_popped(),
                    );
                    last_hops = hops;
                    last_diag = Instant::now();
                }
            }

            input
        });

        self.thread = Some(handle);

        let diag_running = Arc::clone(&self.running);
        let diag_counters = Arc::clone(&self.counters);
        let diag_slot = Arc::clone(&self.diagnostics);
        self.diagnostics_thread = Some(std::thread::spawn(move || {
            let mut last_log = Instant::now();
            while diag_running.load(Ordering::Acquire) {
                std::thread::sleep(DIAGNOSTIC_POLL_INTERVAL);
                if last_log.elapsed() >= DIAGNOSTIC_INTERVAL {
                    let snapshot = diag_slot.snapshot(&diag_counters);
                    tracing::info!(?snapshot, "pipeline diagnostics");
                    last_log = Instant::now();
                }
            }
        }));

        true
    }

    /// Stops the processing thread and both streams. Worst-case exit
    /// latency is one capture timeout plus the in-flight burst (spec.md
    /// §5). Ring buffers are not drained; residual data is discarded.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.playback_bridge = None;

        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(mut input) => {
                    if let Err(e) = input.request_stop() {
                        tracing::warn!("failed to stop input stream: {e}");
                    }
                    self.input_stream = Some(input);
                }
                Err(_) => tracing::warn!("processing thread panicked"),
            }
        }

        if let Some(handle) = self.diagnostics_thread.take() {
            if handle.join().is_err() {
                tracing::warn!("diagnostics thread panicked");
            }
        }

        if let Some(output) = self.output_stream.as_mut() {
            if let Err(e) = output.request_stop() {
                tracing::warn!("failed to stop output stream: {e}");
            }
        }
    }
}
