//! Diagnostic counters and the periodic structured snapshot (spec.md §6).
//!
//! Counters are atomic-relaxed (read for diagnostics only, spec.md §5). The
//! processing thread never logs: it only stores the latest throughput
//! figures into a [`DiagnosticsSlot`] via plain atomic stores. A dedicated
//! low-priority consumer (the diagnostics thread the orchestrator spawns
//! alongside the processing thread) reads the slot roughly once a second
//! and is the only place `tracing::info!` is called for this record — never
//! from the hot loop or the playback callback.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Counters {
    overflows: AtomicU64,
    underflows: AtomicU64,
}

impl Counters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_overflow(&self, frames: u64) {
        self.overflows.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn add_underflow(&self, frames: u64) {
        self.underflows.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    pub fn underflows(&self) -> u64 {
        self.underflows.load(Ordering::Relaxed)
    }
}

/// A single periodic (~1 Hz) diagnostic record: queue occupancy, cumulative
/// over/underflows, and STFT throughput deltas/totals.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSnapshot {
    pub input_ring_fill: usize,
    pub output_ring_fill: usize,
    pub overflows_total: u64,
    pub underflows_total: u64,
    pub hops_processed_total: u64,
    pub hops_processed_delta: u64,
    pub frames_pushed_total: u64,
    pub frames_popped_total: u64,
}

/// Lock-free slot the processing thread stores throughput figures into every
/// loop tick (plain atomic stores only — no lock, no allocation) and that
/// the diagnostics thread reads back to assemble a [`DiagnosticSnapshot`].
#[derive(Debug, Default)]
pub struct DiagnosticsSlot {
    input_ring_fill: AtomicUsize,
    output_ring_fill: AtomicUsize,
    hops_processed_total: AtomicU64,
    hops_processed_delta: AtomicU64,
    frames_pushed_total: AtomicU64,
    frames_popped_total: AtomicU64,
}

impl DiagnosticsSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        input_ring_fill: usize,
        output_ring_fill: usize,
        hops_processed_total: u64,
        hops_processed_delta: u64,
        frames_pushed_total: u64,
        frames_popped_total: u64,
    ) {
        self.input_ring_fill.store(input_ring_fill, Ordering::Relaxed);
        self.output_ring_fill.store(output_ring_fill, Ordering::Relaxed);
        self.hops_processed_total.store(hops_processed_total, Ordering::Relaxed);
        self.hops_processed_delta.store(hops_processed_delta, Ordering::Relaxed);
        self.frames_pushed_total.store(frames_pushed_total, Ordering::Relaxed);
        self.frames_popped_total.store(frames_popped_total, Ordering::Relaxed);
    }

    /// Assembles a full snapshot, pulling the overflow/underflow totals from
    /// `counters` since those live on the shared `Counters` rather than here.
    pub fn snapshot(&self, counters: &Counters) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            input_ring_fill: self.input_ring_fill.load(Ordering::Relaxed),
            output_ring_fill: self.output_ring_fill.load(Ordering::Relaxed),
            overflows_total: counters.overflows(),
            underflows_total: counters.underflows(),
            hops_processed_total: self.hops_processed_total.load(Ordering::Relaxed),
            hops_processed_delta: self.hops_processed_delta.load(Ordering::Relaxed),
            frames_pushed_total: self.frames_pushed_total.load(Ordering::Relaxed),
            frames_popped_total: self.frames_popped_total.load(Ordering::Relaxed),
        }
    }
}
