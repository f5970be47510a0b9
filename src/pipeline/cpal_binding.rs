//! Real `cpal` device bindings for [`CaptureStream`]/[`PlaybackStream`],
//! gated behind the `cpal-device` feature.
//!
//! Grounded on the teacher's `device_setup.rs` (default-device negotiation,
//! the same "log name, log sample rate, warn on input/output mismatch"
//! shape) and `input_pipeline.rs`/`output_routing.rs` (callback-owned ring
//! endpoint, silence-fill on underflow). Two differences from the teacher:
//! the ring here is this crate's own `spsc_ring` rather than `rtrb`, and the
//! capture side exposes a blocking, timeout-bounded `read()` instead of a
//! callback, so it polls its ring on the caller's thread to satisfy the
//! [`CaptureStream`] contract.

use crate::error::StreamError;
use crate::pipeline::device::{CaptureStream, PlaybackStream, PullCallback, ReadOutcome, ReadStatus};
use crate::ring::{spsc_ring, RingConsumer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::time::{Duration, Instant};

const CAPTURE_RING_CAPACITY_FRAMES: usize = 8192;
const CAPTURE_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// A `cpal` input device adapted to the blocking [`CaptureStream`] contract.
pub struct CpalCaptureStream {
    device: Device,
    config: StreamConfig,
    channels: u16,
    sample_rate: u32,
    frames_per_burst: u32,
    stream: Option<Stream>,
    ring_cons: Option<RingConsumer>,
}

impl CpalCaptureStream {
    /// Negotiates the host's default input device and its default config,
    /// the same fallback the teacher's `negotiate_default_devices_and_configs`
    /// uses for the input side.
    pub fn default_device(frames_per_burst: u32) -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| StreamError::new("no input device available"))?;

        let name = device.name().unwrap_or_else(|_| "(unnamed)".to_string());
        let supported = device
            .default_input_config()
            .map_err(|e| StreamError::new(format!("failed to get default input config: {e}")))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        tracing::info!("using input device: {name} ({channels} ch, {sample_rate} Hz)");

        Ok(Self {
            device,
            config: supported.into(),
            channels,
            sample_rate,
            frames_per_burst,
            stream: None,
            ring_cons: None,
        })
    }
}

impl CaptureStream for CpalCaptureStream {
    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn frames_per_burst(&self) -> u32 {
        self.frames_per_burst
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn request_start(&mut self) -> Result<(), StreamError> {
        let channels = self.channels as usize;
        let Some((mut ring_prod, ring_cons)) = spsc_ring(CAPTURE_RING_CAPACITY_FRAMES, channels)
        else {
            return Err(StreamError::new("failed to allocate capture ring"));
        };

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    // Dropped on overflow; the orchestrator's overflow
                    // counter tracks loss once frames reach the input ring.
                    ring_prod.write_interleaved(data, frames);
                },
                |err| tracing::error!("input stream error: {err}"),
                None,
            )
            .map_err(|e| StreamError::new(format!("failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| StreamError::new(format!("failed to start input stream: {e}")))?;

        self.stream = Some(stream);
        self.ring_cons = Some(ring_cons);
        Ok(())
    }

    fn request_stop(&mut self) -> Result<(), StreamError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| StreamError::new(format!("failed to stop input stream: {e}")))?;
        }
        self.ring_cons = None;
        Ok(())
    }

    fn read(&mut self, dst: &mut [f32], frames: usize, timeout: Duration) -> ReadOutcome {
        let Some(ring_cons) = self.ring_cons.as_mut() else {
            return ReadOutcome {
                frames_read: 0,
                status: ReadStatus::Error,
            };
        };

        let deadline = Instant::now() + timeout;
        loop {
            let read = ring_cons.read_interleaved(dst, frames);
            if read > 0 {
                let status = if read < frames {
                    ReadStatus::Timeout
                } else {
                    ReadStatus::Ok
                };
                return ReadOutcome {
                    frames_read: read,
                    status,
                };
            }
            if Instant::now() >= deadline {
                return ReadOutcome {
                    frames_read: 0,
                    status: ReadStatus::Timeout,
                };
            }
            std::thread::sleep(CAPTURE_POLL_INTERVAL);
        }
    }
}

/// A `cpal` output device adapted to [`PlaybackStream`]. Unlike the
/// teacher's `route_output_callback`, the actual pull is delegated entirely
/// to whatever `bind_callback` registers; this binding's job is purely
/// device negotiation and lifecycle.
pub struct CpalPlaybackStream {
    device: Device,
    config: StreamConfig,
    channels: u16,
    sample_rate: u32,
    frames_per_burst: u32,
    stream: Option<Stream>,
    callback: Option<PullCallback>,
}

impl CpalPlaybackStream {
    pub fn default_device(frames_per_burst: u32) -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| StreamError::new("no output device available"))?;

        let name = device.name().unwrap_or_else(|_| "(unnamed)".to_string());
        let supported = device
            .default_output_config()
            .map_err(|e| StreamError::new(format!("failed to get default output config: {e}")))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        tracing::info!("using output device: {name} ({channels} ch, {sample_rate} Hz)");

        Ok(Self {
            device,
            config: supported.into(),
            channels,
            sample_rate,
            frames_per_burst,
            stream: None,
            callback: None,
        })
    }
}

impl PlaybackStream for CpalPlaybackStream {
    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn frames_per_burst(&self) -> u32 {
        self.frames_per_burst
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn request_start(&mut self) -> Result<(), StreamError> {
        let channels = self.channels as usize;
        let Some(mut callback) = self.callback.take() else {
            return Err(StreamError::new(
                "bind_callback must be called before request_start",
            ));
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    callback(data, frames);
                },
                |err| tracing::error!("output stream error: {err}"),
                None,
            )
            .map_err(|e| StreamError::new(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| StreamError::new(format!("failed to start output stream: {e}")))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn request_stop(&mut self) -> Result<(), StreamError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| StreamError::new(format!("failed to stop output stream: {e}")))?;
        }
        Ok(())
    }

    fn bind_callback(&mut self, callback: PullCallback) {
        self.callback = Some(callback);
    }
}
