use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Instant;

use crate::common::format_elapsed;

/// A canonical paper with known identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(alias = "id")]
    pub paper_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, alias = "venue")]
    pub journal: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub openalex_id: Option<String>,
    #[serde(default, alias = "semantic_scholar_id")]
    pub s2_id: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl CorpusRecord {
    pub fn has_doi(&self) -> bool {
        present(&self.doi)
    }

    /// At least one external identifier
    pub fn has_identifier(&self) -> bool {
        self.has_doi() || present(&self.openalex_id) || present(&self.s2_id)
    }

    /// DOI confirmed by a second identifier service
    pub fn is_cross_validated(&self) -> bool {
        self.has_doi() && (present(&self.openalex_id) || present(&self.s2_id))
    }
}

/// Load corpus records from a JSON Lines file (gzip-compressed when the name ends in `.gz`).
///
/// Malformed lines are skipped with a warning.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    info!("Loading corpus from: {}", path.display());
    let start = Instant::now();

    let file = File::open(path).with_context(|| format!("Failed to open corpus: {}", path.display()))?;
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");
    let reader: Box<dyn Read> = if is_gz {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let reader = BufReader::new(reader);

    let mut records = Vec::new();
    let mut lines_failed = 0;

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.context("Failed to read line from corpus")?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CorpusRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                if lines_failed < 5 {
                    warn!("Failed to parse corpus line {}: {}", line_no + 1, e);
                }
                lines_failed += 1;
            }
        }
    }

    info!(
        "Loaded {} corpus records in {}",
        records.len(),
        format_elapsed(start.elapsed())
    );
    if lines_failed > 0 {
        warn!("Failed to parse {} corpus lines", lines_failed);
    }

    Ok(records)
}
