//! Realtime full-duplex audio pipeline: 48 kHz stereo capture, a 16 kHz
//! mono STFT analysis/synthesis loop (currently an identity spectral
//! transform), and 48 kHz stereo playback, bridged across threads by
//! lock-free SPSC ring buffers.
//!
//! # Architecture
//!
//! ```text
//! [capture device] --read()--> [processing thread]
//!                                  │
//!                                  ▼ (48k stereo interleaved)
//!                             input ring (SPSC)
//!                                  │
//!                                  ▼
//!                          deinterleave → downsample ×2 (3:1) → mix to mono
//!                                  │
//!                                  ▼
//!                              mono ring (SPSC, 16k)
//!                                  │
//!                                  ▼ (96-sample hops)
//!                               StftEngine
//!                                  │
//!                                  ▼
//!                         upsample (1:3) → duplicate to stereo
//!                                  │
//!                                  ▼
//!                             output ring (SPSC)
//!                                  │
//!                                  ▼ bound callback
//!                            [playback device]
//! ```
//!
//! The three subsystems with a tight realtime/no-allocation contract are
//! [`ring`] (the SPSC ring), [`resampler`] (3:1/1:3 rate conversion) and
//! [`stft`] (the overlap-add STFT engine). [`pipeline`] wires them into the
//! orchestrator described in its module docs, against the [`pipeline::device`]
//! capture/playback boundary. [`config`] and [`error`] hold the ambient
//! configuration and error types shared across all of the above.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod resampler;
pub mod ring;
pub mod stft;

pub use config::PipelineConfig;
pub use error::{PipelineError, StreamError, StreamRole};
pub use pipeline::{
    CaptureStream, Counters, DiagnosticSnapshot, PipelineOrchestrator, PlaybackStream,
    PullCallback, ReadOutcome, ReadStatus,
};
pub use resampler::{Downsampler3, Upsampler3};
pub use ring::{spsc_ring, RingConsumer, RingProducer};
pub use stft::StftEngine;

#[cfg(feature = "cpal-device")]
pub use pipeline::{CpalCaptureStream, CpalPlaybackStream};
