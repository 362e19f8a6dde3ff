use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::{read_json, write_json};
use crate::resolution::ResolutionResult;

/// Output file of the resolve command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRun {
    pub results: Vec<ResolutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsFile {
    Run(ResolutionRun),
    Bare(Vec<ResolutionResult>),
}

impl ResolutionRun {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Load a resolve output file, or a bare JSON array of results
    pub fn load(path: &Path) -> Result<Self> {
        Ok(match read_json::<ResultsFile>(path)? {
            ResultsFile::Run(run) => run,
            ResultsFile::Bare(results) => ResolutionRun {
                results,
                statistics: None,
            },
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateStats {
    pub corpus_records: usize,
    pub samples_generated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveStats {
    pub total_citations: usize,
    pub resolved: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub checkpoints_saved: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluateStats {
    pub citations_evaluated: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub ece: f64,
}
