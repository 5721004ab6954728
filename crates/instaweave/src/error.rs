//! Error types for instaweave operations.
//!
//! [`InstaweaveError`] wraps every failure a caller of the library can see:
//! reading input, loading a model, and the fatal conditions of a playbook
//! run. Non-fatal findings are never errors; they travel as diagnostics in
//! the run's notes.

use std::io;

use thiserror::Error;

use instaweave_core::{
    error::{LoadError, ModelError},
    phase::Phase,
};

/// The main error type for instaweave operations.
#[derive(Debug, Error)]
pub enum InstaweaveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A phase aborted. Carries the phase so a caller can report where the
    /// run stopped.
    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: ModelError,
    },

    /// A phase was requested before its predecessor completed, or twice.
    #[error("{requested} cannot run: {reason}")]
    PhaseOrder { requested: Phase, reason: String },
}

impl InstaweaveError {
    /// Wraps a model error raised inside `phase`.
    pub fn in_phase(phase: Phase, source: ModelError) -> Self {
        Self::Phase { phase, source }
    }

    /// The phase this error belongs to, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            Self::PhaseOrder { requested, .. } => Some(*requested),
            Self::Io(_) | Self::Load(_) | Self::Model(_) => None,
        }
    }
}
