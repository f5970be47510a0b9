//! Pipeline orchestration: device-stream traits, the end-to-end
//! orchestrator, and (behind `cpal-device`) a real `cpal` binding.

pub mod device;
pub mod diagnostics;
mod orchestrator;
mod playback_bridge;
mod processing;

#[cfg(feature = "cpal-device")]
pub mod cpal_binding;

pub use device::{CaptureStream, PlaybackStream, PullCallback, ReadOutcome, ReadStatus};
pub use diagnostics::{Counters, DiagnosticSnapshot, DiagnosticsSlot};
pub use orchestrator::PipelineOrchestrator;

#[cfg(feature = "cpal-device")]
pub use cpal_binding::{CpalCaptureStream, CpalPlaybackStream};
