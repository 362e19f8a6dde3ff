//! Scoring resolution results against ground truth.

pub mod citation;
pub mod confusion;
pub mod matching;
pub mod ranking;
pub mod report;

pub use citation::*;
pub use confusion::*;
pub use matching::*;
pub use report::*;
