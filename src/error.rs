//! Typed startup/configuration error taxonomy.
//!
//! Mirrors `wavecraft-bridge`'s one-variant-per-failure-mode `thiserror`
//! style: every failure that can make `PipelineOrchestrator::start` return
//! `false` (spec.md §7) gets a named variant with a message a human can act
//! on. Nothing in the hot path (capture read, ring writes, playback pull)
//! ever produces one of these — that part of the contract stays boolean
//! and counter-based exactly as spec.md §7 requires.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Input,
    Output,
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamRole::Input => write!(f, "input"),
            StreamRole::Output => write!(f, "output"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no input stream set; call set_input_stream before start()")]
    NoInputStream,

    #[error("no output stream set; call set_output_stream before start()")]
    NoOutputStream,

    #[error("invalid stream parameters: {detail}")]
    InvalidStreamParameters { detail: String },

    #[error("failed to start {stream} stream: {source}")]
    StreamStart { stream: StreamRole, source: String },
}

/// A plain string error from a device-stream collaborator (spec.md §6);
/// kept separate from `PipelineError` because it originates at the trait
/// boundary, not inside the orchestrator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StreamError(pub String);

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
