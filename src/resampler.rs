//! Fixed-ratio 3:1 / 1:3 mono resamplers bridging the 48 kHz device rate and
//! the 16 kHz STFT rate.

/// Down-by-3 converter: `out[g] = mean(in[3g], in[3g+1], in[3g+2])`.
///
/// Stateless — a flat three-tap average is adequate for this identity-DSP
/// pilot (spec.md §4.2); swap in a polyphase FIR behind this same interface
/// if a sharper passband is ever needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Downsampler3;

impl Downsampler3 {
    pub fn new() -> Self {
        Self
    }

    /// `input.len()` MUST be a multiple of 3. Writes `input.len() / 3`
    /// samples to `output`, clamped to `output.len()`. Returns the number of
    /// samples written.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> usize {
        debug_assert!(
            input.len() % 3 == 0,
            "Downsampler3 input length must be a multiple of 3"
        );

        let out_len = (input.len() / 3).min(output.len());
        for g in 0..out_len {
            let base = g * 3;
            output[g] = (input[base] + input[base + 1] + input[base + 2]) / 3.0;
        }
        out_len
    }

    pub fn reset(&mut self) {}
}

/// Up-by-3 converter. For each input sample `x_i` emits `x_i`, `x_i + d`,
/// `x_i + 2d` where `d = (x_{i+1} - x_i) / 3` (or `d = 0` at the tail
/// boundary, repeating `x_i`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Upsampler3 {
    /// Last input sample seen across calls. Reserved for a future
    /// leading-tap continuity fix (spec.md §9); not currently read.
    prev_sample: f32,
    has_prev: bool,
}

impl Upsampler3 {
    pub fn new() -> Self {
        Self {
            prev_sample: 0.0,
            has_prev: false,
        }
    }

    /// Writes `3 * input.len()` samples to `output`, clamped to
    /// `output.len()`. Returns the number of samples written.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> usize {
        let wanted = input.len() * 3;
        let out_len = wanted.min(output.len());

        for i in 0..input.len() {
            let base = i * 3;
            if base >= out_len {
                break;
            }

            let current = input[i];
            let next = if i + 1 < input.len() {
                input[i + 1]
            } else {
                current
            };
            let d = (next - current) / 3.0;

            let remaining = out_len - base;
            if remaining > 0 {
                output[base] = current;
            }
            if remaining > 1 {
                output[base + 1] = current + d;
            }
            if remaining > 2 {
                output[base + 2] = current + 2.0 * d;
            }
        }

        if let Some(&last) = input.last() {
            self.prev_sample = last;
            self.has_prev = true;
        }

        out_len
    }

    pub fn reset(&mut self) {
        self.prev_sample = 0.0;
        self.has_prev = false;
    }
}
