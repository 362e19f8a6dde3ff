use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::common::write_json_atomic;
use crate::error::CheckpointLoadError;
use crate::resolution::ResolutionResult;

use super::BatchStatistics;

/// Snapshot of a batch in progress, enough to resume it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Completed results, in input order of the completed citations
    pub results: Vec<ResolutionResult>,
    /// Statistics as of the snapshot (informational; recomputed on resume)
    #[serde(default)]
    pub statistics: Value,
    pub count: usize,
}

impl Checkpoint {
    pub fn new(results: Vec<ResolutionResult>, statistics: &BatchStatistics) -> Self {
        let count = results.len();
        Self {
            results,
            statistics: statistics.to_json(),
            count,
        }
    }

    /// Rewrite the checkpoint file atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("Failed to write checkpoint to {:?}", path))
    }

    /// Load a checkpoint, returning None if the file doesn't exist
    pub fn load(path: &Path) -> Result<Option<Self>, CheckpointLoadError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).map_err(|source| CheckpointLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let checkpoint: Self =
            serde_json::from_str(&json).map_err(|source| CheckpointLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Some(checkpoint))
    }
}

/// Persist `results` together with the statistics snapshot
pub fn save_checkpoint(
    path: &Path,
    results: &[ResolutionResult],
    statistics: &BatchStatistics,
) -> Result<()> {
    Checkpoint::new(results.to_vec(), statistics).save(path)
}

/// Results stored at `path`, or None when no checkpoint exists
pub fn load_checkpoint(path: &Path) -> Result<Option<Vec<ResolutionResult>>, CheckpointLoadError> {
    Ok(Checkpoint::load(path)?.map(|cp| cp.results))
}
