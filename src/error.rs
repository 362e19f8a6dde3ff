//! Error types for the resolution engine and evaluation harness.
//!
//! Application code propagates with `anyhow`; these typed errors mark the
//! places where callers are expected to match on the failure kind.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid batch or rate limiter configuration, raised at construction
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid configuration: {field} {reason}")]
pub struct ConfigValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A single resolver attempt that did not produce a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// Resolver deadline exceeded
    #[error("Resolution timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },

    /// Resolver returned an error
    #[error("Resolution failed: {0}")]
    Failure(String),
}

impl ResolutionError {
    /// Short label used to bucket errors in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::Timeout { .. } => "timeout",
            ResolutionError::Failure(_) => "failure",
        }
    }
}

/// Checkpoint file exists but cannot be used
#[derive(Error, Debug)]
pub enum CheckpointLoadError {
    #[error("Failed to read checkpoint {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse checkpoint {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid input handed to the metrics engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsInputError {
    #[error("Ground truth and results must have the same length ({ground_truth} vs {results})")]
    LengthMismatch { ground_truth: usize, results: usize },

    #[error("Number of calibration bins must be at least 1")]
    NoBins,
}
