//! Pipeline configuration constants.
//!
//! spec.md treats sample rate, warm-up window, ring headroom and prefill
//! size as fixed constants; `PipelineConfig` collects them so a deployment
//! can assert or (rarely) override them at startup instead of them being
//! scattered magic numbers through the orchestrator.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Expected device sample rate. spec.md §6: 48000 Hz.
    pub sample_rate_hz: u32,
    /// Expected device channel count. spec.md §6: stereo (2).
    pub channels: u16,
    /// Underflow-counting suppression window after `start()`. spec.md §4.4: 300 ms.
    pub warm_up: Duration,
    /// Ring headroom, expressed as a fraction of a second. spec.md §4.4: ~200 ms (sr/5).
    pub ring_headroom_denominator: u32,
    /// Output ring prefill size in multiples of `frames_per_burst`. spec.md §4.4: ~20.
    pub prefill_bursts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            channels: 2,
            warm_up: Duration::from_millis(300),
            ring_headroom_denominator: 5,
            prefill_bursts: 20,
        }
    }
}

impl PipelineConfig {
    /// Validates that `frames_per_burst` is divisible by 3, as the 3:1/1:3
    /// resampler geometry requires (spec.md §6).
    pub fn validate_frames_per_burst(&self, frames_per_burst: u32) -> Result<(), String> {
        if frames_per_burst == 0 || !frames_per_burst.is_multiple_of(3) {
            return Err(format!(
                "frames_per_burst ({frames_per_burst}) must be a positive multiple of 3"
            ));
        }
        Ok(())
    }
}
