//! Structured error type for public API surfaces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SynthesisError>;

/// The external model stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelStage {
    Duration,
    Pitch,
    Decoder,
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStage::Duration => "duration",
            ModelStage::Pitch => "pitch",
            ModelStage::Decoder => "decoder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum SynthesisError {
    #[error("Malformed label ({reason}): {label}")]
    MalformedLabel { label: String, reason: String },

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("Unknown phoneme {symbol:?} at position {position}")]
    UnknownPhoneme { symbol: String, position: usize },

    #[error("{stage} model call failed: {message}")]
    ModelCallFailed { stage: ModelStage, message: String },

    #[error("I/O failed for {path:?}: {message}")]
    IoFailure { path: PathBuf, message: String },

    #[error("Linguistic analyzer failed: {0}")]
    AnalyzerFailed(String),

    #[error("Runtime is not initialized")]
    NotInitialized,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Runtime worker thread stopped")]
    RuntimeStopped,
}

impl SynthesisError {
    pub(crate) fn malformed(label: &str, reason: impl Into<String>) -> Self {
        SynthesisError::MalformedLabel {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn model(stage: ModelStage, err: anyhow::Error) -> Self {
        SynthesisError::ModelCallFailed {
            stage,
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn io(path: &Path, err: impl fmt::Display) -> Self {
        SynthesisError::IoFailure {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
