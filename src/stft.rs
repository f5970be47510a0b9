//! Streaming STFT analysis/synthesis engine: fixed N=512/H=96/L=480
//! overlap-add with per-sample squared-window normalization.
//!
//! The spectral step is an intentional identity transform (`Y = X`) — the
//! designated extension point for future spectral processing (spec.md
//! §4.3 step 4). Everything else here — window application, the FFT pair,
//! and the OLA ring accounting — is the permanent contract.

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

const N: usize = 512;
const H: usize = 96;
const LEAD_ZEROS: usize = 32;
const HIST_LEN: usize = 384;
const OLA_CAPACITY: usize = 32768; // power of two >= 8 * H
const NORM_EPSILON: f32 = 1e-8;

/// Streaming overlap-add STFT processor over fixed N=512/H=96/L=480
/// parameters. `push_time_domain`/`pop_time_domain` never allocate.
pub struct StftEngine {
    window: [f32; N],

    hop_buf: [f32; H],
    hop_fill: usize,
    hist384: [f32; HIST_LEN],

    analysis_frame: [f32; N],
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,

    ola_ring: Box<[f32; OLA_CAPACITY]>,
    norm_ring: Box<[f32; OLA_CAPACITY]>,
    ola_mask: usize,
    ola_write: usize,
    ola_read: usize,
    avail: usize,

    frames_pushed: u64,
    frames_popped: u64,
    hops_processed: u64,
}

fn hann_window() -> [f32; N] {
    let mut w = [0.0f32; N];
    for (n, slot) in w.iter_mut().enumerate() {
        *slot = 0.5 * (1.0 - (2.0 * PI * n as f32 / (N as f32 - 1.0)).cos());
    }
    w
}

impl StftEngine {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(N);
        let inverse = planner.plan_fft_inverse(N);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            window: hann_window(),
            hop_buf: [0.0; H],
            hop_fill: 0,
            hist384: [0.0; HIST_LEN],
            analysis_frame: [0.0; N],
            spectrum: vec![Complex32::new(0.0, 0.0); N],
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
            forward,
            inverse,
            ola_ring: Box::new([0.0; OLA_CAPACITY]),
            norm_ring: Box::new([0.0; OLA_CAPACITY]),
            ola_mask: OLA_CAPACITY - 1,
            ola_write: 0,
            ola_read: 0,
            avail: 0,
            frames_pushed: 0,
            frames_popped: 0,
            hops_processed: 0,
        }
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    pub fn frames_popped(&self) -> u64 {
        self.frames_popped
    }

    pub fn hops_processed(&self) -> u64 {
        self.hops_processed
    }

    /// Appends `n` mono 16 kHz samples, triggering `process_one_hop` each
    /// time `hop_buf` fills. Never allocates.
    pub fn push_time_domain(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.hop_buf[self.hop_fill] = sample;
            self.hop_fill += 1;
            self.frames_pushed += 1;

            if self.hop_fill == H {
                self.process_one_hop();
                self.hop_fill = 0;
            }
        }
    }

    /// Copies up to `min(out.len(), avail)` normalized output samples from
    /// the OLA ring into `out`, zeroing the consumed ring cells so the ring
    /// can wrap safely. Returns the number of samples written.
    pub fn pop_time_domain(&mut self, out: &mut [f32]) -> usize {
        let produced = out.len().min(self.avail);
        for sample in out.iter_mut().take(produced) {
            let idx = self.ola_read & self.ola_mask;
            let norm = self.norm_ring[idx];
            *sample = if norm > NORM_EPSILON {
                self.ola_ring[idx] / norm
            } else {
                0.0
            };
            self.ola_ring[idx] = 0.0;
            self.norm_ring[idx] = 0.0;
            self.ola_read = self.ola_read.wrapping_add(1);
        }

        self.avail -= produced;
        self.frames_popped += produced as u64;
        produced
    }

    fn process_one_hop(&mut self) {
        self.analysis_frame[..LEAD_ZEROS].fill(0.0);
        self.analysis_frame[LEAD_ZEROS..LEAD_ZEROS + HIST_LEN].copy_from_slice(&self.hist384);
        self.analysis_frame[LEAD_ZEROS + HIST_LEN..N].copy_from_slice(&self.hop_buf);

        for i in 0..N {
            self.spectrum[i] = Complex32::new(self.analysis_frame[i] * self.window[i], 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        // Spectral processing: identity (Y = X). Designated extension point.

        self.inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let inv_n = 1.0 / N as f32;
        let write_base = self.ola_write;
        for i in 0..N {
            let synthesized = self.spectrum[i].re * inv_n * self.window[i];
            let idx = (write_base + i) & self.ola_mask;
            self.ola_ring[idx] += synthesized;
            self.norm_ring[idx] += self.window[i] * self.window[i];
        }
        self.ola_write = (self.ola_write + H) & self.ola_mask;
        self.avail += H;

        self.hist384.copy_within(H.., 0);
        self.hist384[HIST_LEN - H..].copy_from_slice(&self.hop_buf);

        self.hops_processed += 1;
    }
}

impl Default for StftEngine {
    fn default() -> Self {
        Self::new()
    }
}
