//! Batch citation resolution with synthetic ground truth and evaluation metrics.
//!
//! - [`batch`]: chunked, rate-limited, checkpointable resolution driven by an
//!   injected [`resolution::Resolver`]
//! - [`ground_truth`]: degraded citations with known answers from a corpus
//! - [`metrics`]: confusion matrices, calibration, threshold curves and
//!   ranking metrics

pub mod batch;
pub mod common;
pub mod error;
pub mod ground_truth;
pub mod metrics;
pub mod resolution;
