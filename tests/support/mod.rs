//! In-memory `CaptureStream`/`PlaybackStream` fakes so pipeline integration
//! tests can drive the orchestrator without real hardware.

use audio_pipeline::{CaptureStream, PlaybackStream, PullCallback, ReadOutcome, ReadStatus, StreamError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a `FakeCaptureStream` does once its prerecorded data runs out.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionBehavior {
    /// Keep producing silence, as a real device would between sounds.
    Silence,
    /// Return zero frames (as if the device had nothing new to offer),
    /// so a test can bound "total output produced" at a known input size.
    Stall,
}

/// Feeds prerecorded interleaved frames, then behaves per `ExhaustionBehavior`
/// once exhausted.
pub struct FakeCaptureStream {
    channels: u16,
    frames_per_burst: u32,
    sample_rate: u32,
    data: Vec<f32>,
    total_frames: usize,
    cursor: usize,
    on_exhaustion: ExhaustionBehavior,
}

impl FakeCaptureStream {
    pub fn new(channels: u16, frames_per_burst: u32, sample_rate: u32, data: Vec<f32>) -> Self {
        let total_frames = data.len() / channels as usize;
        Self {
            channels,
            frames_per_burst,
            sample_rate,
            data,
            total_frames,
            cursor: 0,
            on_exhaustion: ExhaustionBehavior::Silence,
        }
    }

    pub fn silence(
        channels: u16,
        frames_per_burst: u32,
        sample_rate: u32,
        total_frames: usize,
    ) -> Self {
        Self::new(
            channels,
            frames_per_burst,
            sample_rate,
            vec![0.0f32; total_frames * channels as usize],
        )
    }

    pub fn with_exhaustion_behavior(mut self, behavior: ExhaustionBehavior) -> Self {
        self.on_exhaustion = behavior;
        self
    }
}

impl CaptureStream for FakeCaptureStream {
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
        Ok(())
    }

    fn request_stop(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn read(&mut self, dst: &mut [f32], frames: usize, _timeout: Duration) -> ReadOutcome {
        let channels = self.channels as usize;
        let remaining = self.total_frames - self.cursor;
        let capacity = dst.len() / channels;

        if remaining == 0 {
            return match self.on_exhaustion {
                ExhaustionBehavior::Stall => ReadOutcome {
                    frames_read: 0,
                    status: ReadStatus::Timeout,
                },
                ExhaustionBehavior::Silence => {
                    let n = frames.min(capacity);
                    dst[..n * channels].fill(0.0);
                    ReadOutcome {
                        frames_read: n,
                        status: ReadStatus::Ok,
                    }
                }
            };
        }

        let n = frames.min(remaining).min(capacity);
        let start = self.cursor * channels;
        dst[..n * channels].copy_from_slice(&self.data[start..start + n * channels]);
        self.cursor += n;
        ReadOutcome {
            frames_read: n,
            status: ReadStatus::Ok,
        }
    }
}

/// Handle kept by the test after the matching `FakePlaybackStream` has been
/// moved into the orchestrator, so the test can still act as "the host
/// device" and pull samples on demand.
#[derive(Clone)]
pub struct FakePlaybackHandle {
    callback: Arc<Mutex<Option<PullCallback>>>,
}

impl FakePlaybackHandle {
    /// Pulls `frames` frames into `dst`, simulating one playback-device
    /// callback invocation. Returns 0 if no callback has been bound yet.
    pub fn pull(&self, dst: &mut [f32], frames: usize) -> usize {
        let mut guard = self.callback.lock().expect("fake playback mutex poisoned");
        match guard.as_mut() {
            Some(callback) => callback(dst, frames),
            None => 0,
        }
    }
}

pub struct FakePlaybackStream {
    channels: u16,
    frames_per_burst: u32,
    sample_rate: u32,
    callback: Arc<Mutex<Option<PullCallback>>>,
}

impl FakePlaybackStream {
    pub fn new(channels: u16, frames_per_burst: u32, sample_rate: u32) -> (Self, FakePlaybackHandle) {
        let callback = Arc::new(Mutex::new(None));
        let stream = Self {
            channels,
            frames_per_burst,
            sample_rate,
            callback: Arc::clone(&callback),
        };
        (stream, FakePlaybackHandle { callback })
    }
}

impl PlaybackStream for FakePlaybackStream {
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
        Ok(())
    }

    fn request_stop(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn bind_callback(&mut self, callback: PullCallback) {
        *self.callback.lock().expect("fake playback mutex poisoned") = Some(callback);
    }
}
