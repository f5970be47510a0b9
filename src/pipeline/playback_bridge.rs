//! The orchestrator's `pull_to` bridge (spec.md §6): the single point where
//! output-ring frames are pulled and underflow is counted outside the
//! warm-up window.
//!
//! `PlaybackBridge` is handed out two ways: wrapped into the `PullCallback`
//! closure a real device binding registers via `bind_callback`, and directly
//! through `PipelineOrchestrator::pull_to` for callers (tests, non-`cpal`
//! hosts) that want to pull without going through a `PlaybackStream` at all.
//! Both paths end up calling the same method on the same ring consumer.

use crate::pipeline::diagnostics::Counters;
use crate::ring::RingConsumer;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(super) struct PlaybackBridge {
    out_cons: UnsafeCell<RingConsumer>,
    counters: Arc<Counters>,
    start_instant: Instant,
    warm_up: Duration,
}

// SAFETY: exactly one logical caller invokes `pull_to` at a time (the audio
// host never runs two output callbacks concurrently, and a direct caller of
// `PipelineOrchestrator::pull_to` is responsible for the same discipline) —
// the same single-consumer invariant `RingConsumer` itself relies on.
unsafe impl Sync for PlaybackBridge {}

impl PlaybackBridge {
    pub(super) fn new(out_cons: RingConsumer, counters: Arc<Counters>, warm_up: Duration) -> Self {
        Self {
            out_cons: UnsafeCell::new(out_cons),
            counters,
            start_instant: Instant::now(),
            warm_up,
        }
    }

    /// Reads up to `num_frames` stereo frames into `out`. Short reads are
    /// zero-filled; the deficit counts as underflow only past the warm-up
    /// window (spec.md §4.4/§8). Always returns `num_frames`.
    pub(super) fn pull_to(&self, out: &mut [f32], num_frames: usize) -> usize {
        // SAFETY: see the `Sync` justification above.
        let cons = unsafe { &mut *self.out_cons.get() };
        let channels = cons.channels();
        let read = cons.read_interleaved(out, num_frames);
        if read < num_frames {
            let missing = num_frames - read;
            out[read * channels..num_frames * channels].fill(0.0);
            if self.start_instant.elapsed() >= self.warm_up {
                self.counters.add_underflow(missing as u64);
            }
        }
        num_frames
    }
}
