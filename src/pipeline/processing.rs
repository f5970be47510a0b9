//! The processing thread's per-burst work: deinterleave, downsample, mix to
//! mono, drive the STFT engine per hop, upsample, duplicate to stereo,
//! interleave into the output ring. Mirrors the teacher's
//! `InputCallbackPipeline` in shape (one struct owning every scratch
//! buffer, one `run_once` driving a single burst through the chain) but
//! adapted to a blocking capture-read loop instead of a cpal callback.

use crate::pipeline::diagnostics::Counters;
use crate::resampler::{Downsampler3, Upsampler3};
use crate::ring::{RingConsumer, RingProducer};
use crate::stft::StftEngine;
use std::sync::Arc;

pub(super) struct ProcessingState {
    pub(super) channels: usize,
    pub(super) fpb: usize,

    pub(super) in_prod: RingProducer,
    pub(super) in_cons: RingConsumer,
    pub(super) out_prod: RingProducer,
    pub(super) mono_prod: RingProducer,
    pub(super) mono_cons: RingConsumer,

    pub(super) downsample_l: Downsampler3,
    pub(super) downsample_r: Downsampler3,
    pub(super) upsample: Upsampler3,
    pub(super) stft: StftEngine,

    pub(super) counters: Arc<Counters>,

    // Scratch buffers, sized once at start() and never resized.
    tmp_in: Vec<f32>,
    tmp_xfer: Vec<f32>,
    l48: Vec<f32>,
    r48: Vec<f32>,
    l16: Vec<f32>,
    r16: Vec<f32>,
    mono16: Vec<f32>,
    hop_in16: Vec<f32>,
    hop_out16: Vec<f32>,
    up48_mono: Vec<f32>,
    tmp_out: Vec<f32>,
}

const HOP: usize = 96;

impl ProcessingState {
    pub(super) fn new(
        channels: usize,
        fpb: usize,
        in_prod: RingProducer,
        in_cons: RingConsumer,
        out_prod: RingProducer,
        mono_prod: RingProducer,
        mono_cons: RingConsumer,
        counters: Arc<Counters>,
    ) -> Self {
        let fpb_div3 = fpb / 3;
        Self {
            channels,
            fpb,
            in_prod,
            in_cons,
            out_prod,
            mono_prod,
            mono_cons,
            downsample_l: Downsampler3::new(),
            downsample_r: Downsampler3::new(),
            upsample: Upsampler3::new(),
            stft: StftEngine::new(),
            counters,
            tmp_in: vec![0.0; fpb * channels],
            tmp_xfer: vec![0.0; fpb * channels],
            l48: vec![0.0; fpb],
            r48: vec![0.0; fpb],
            l16: vec![0.0; fpb_div3],
            r16: vec![0.0; fpb_div3],
            mono16: vec![0.0; fpb_div3],
            hop_in16: vec![0.0; HOP],
            hop_out16: vec![0.0; HOP],
            up48_mono: vec![0.0; HOP * 3],
            tmp_out: vec![0.0; HOP * 3 * channels],
        }
    }

    pub(super) fn tmp_in_buf(&mut self) -> &mut [f32] {
        &mut self.tmp_in
    }

    /// Pushes newly captured frames into the input ring, counting overflow.
    pub(super) fn ingest_capture(&mut self, frames: usize) {
        let written = self.in_prod.write_interleaved(&self.tmp_in, frames);
        if written < frames {
            self.counters.add_overflow((frames - written) as u64);
        }
    }

    /// Drains as many full `fpb`-sized bursts as the input ring and output
    /// ring headroom allow (spec.md §4.4 step 3).
    pub(super) fn drain_ready_bursts(&mut self) {
        while self.in_cons.available_to_read() >= self.fpb
            && self.out_prod.available_to_write() >= self.fpb
        {
            self.process_one_burst();
        }
    }

    fn process_one_burst(&mut self) {
        let fpb = self.fpb;
        let channels = self.channels;

        let read = self
            .in_cons
            .read_interleaved(&mut self.tmp_xfer, fpb);
        debug_assert_eq!(read, fpb);

        deinterleave_stereo(&self.tmp_xfer[..fpb * channels], channels, &mut self.l48, &mut self.r48);

        let fpb_div3 = fpb / 3;
        self.downsample_l.process(&self.l48, &mut self.l16[..fpb_div3]);
        self.downsample_r.process(&self.r48, &mut self.r16[..fpb_div3]);

        for i in 0..fpb_div3 {
            self.mono16[i] = 0.5 * (self.l16[i] + self.r16[i]);
        }

        let mono_written = self
            .mono_prod
            .write_interleaved(&self.mono16[..fpb_div3], fpb_div3);
        if mono_written < fpb_div3 {
            self.counters.add_overflow((fpb_div3 - mono_written) as u64);
        }

        while self.mono_cons.available_to_read() >= HOP {
            self.drain_one_hop();
        }
    }

    fn drain_one_hop(&mut self) {
        let read = self.mono_cons.read_interleaved(&mut self.hop_in16, HOP);
        debug_assert_eq!(read, HOP);

        self.stft.push_time_domain(&self.hop_in16);
        let produced = self.stft.pop_time_domain(&mut self.hop_out16);
        if produced == 0 {
            return;
        }

        let up_produced = self
            .upsample
            .process(&self.hop_out16[..produced], &mut self.up48_mono);

        let channels = self.channels;
        for i in 0..up_produced {
            let sample = self.up48_mono[i];
            self.tmp_out[i * channels] = sample;
            if channels > 1 {
                self.tmp_out[i * channels + 1] = sample;
            }
            for ch in 2..channels {
                self.tmp_out[i * channels + ch] = 0.0;
            }
        }

        let written = self
            .out_prod
            .write_interleaved(&self.tmp_out[..up_produced * channels], up_produced);
        if written < up_produced {
            self.counters.add_overflow((up_produced - written) as u64);
        }
    }
}

fn deinterleave_stereo(data: &[f32], channels: usize, left: &mut [f32], right: &mut [f32]) {
    for i in 0..left.len() {
        left[i] = data[i * channels];
        right[i] = if channels > 1 { data[i * channels + 1] } else { left[i] };
    }
}
