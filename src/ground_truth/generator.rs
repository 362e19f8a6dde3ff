use anyhow::Result;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{apply_degradation, CorpusRecord, DegradationType, Difficulty, GroundTruthCitation, GroundTruthMetadata};
use crate::common::{read_json, write_json};

/// Knobs for [`GroundTruthGenerator::generate_from_corpus`]
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub num_samples: usize,
    /// Cycle easy/medium/hard instead of drawing difficulty at random
    pub stratify_by_difficulty: bool,
    pub require_doi: bool,
    /// Require a DOI plus an OpenAlex or Semantic Scholar id
    pub require_cross_validation: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            num_samples: 100,
            stratify_by_difficulty: true,
            require_doi: false,
            require_cross_validation: false,
        }
    }
}

/// Turns corpus records into degraded citations with known answers.
///
/// Output depends only on the corpus, the seed and the options: every call
/// starts from a fresh RNG seeded with `seed`.
pub struct GroundTruthGenerator {
    corpus: Vec<CorpusRecord>,
    seed: u64,
}

impl GroundTruthGenerator {
    pub fn new(corpus: Vec<CorpusRecord>, seed: u64) -> Self {
        Self { corpus, seed }
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus.len()
    }

    fn is_candidate(record: &CorpusRecord, options: &GenerationOptions) -> bool {
        if record.title.trim().is_empty() || !record.has_identifier() {
            return false;
        }
        if options.require_doi && !record.has_doi() {
            return false;
        }
        if options.require_cross_validation && !record.is_cross_validated() {
            return false;
        }
        true
    }

    pub fn generate_from_corpus(&self, options: &GenerationOptions) -> Vec<GroundTruthCitation> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut candidates: Vec<&CorpusRecord> = self
            .corpus
            .iter()
            .filter(|r| Self::is_candidate(r, options))
            .collect();
        info!(
            "{} of {} corpus records are eligible",
            candidates.len(),
            self.corpus.len()
        );

        candidates.shuffle(&mut rng);
        if candidates.len() < options.num_samples {
            warn!(
                "Requested {} samples but only {} eligible records exist",
                options.num_samples,
                candidates.len()
            );
        }
        candidates.truncate(options.num_samples);

        candidates
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let difficulty = if options.stratify_by_difficulty {
                    Difficulty::ALL[i % Difficulty::ALL.len()]
                } else {
                    Difficulty::ALL[rng.gen_range(0..Difficulty::ALL.len())]
                };
                let choices = difficulty.degradations();
                let degradation = choices[rng.gen_range(0..choices.len())];
                self.build_sample(record, difficulty, degradation, &mut rng)
            })
            .collect()
    }

    fn build_sample(
        &self,
        record: &CorpusRecord,
        difficulty: Difficulty,
        degradation: DegradationType,
        rng: &mut StdRng,
    ) -> GroundTruthCitation {
        GroundTruthCitation {
            citation: apply_degradation(record, degradation, rng),
            ground_truth_doi: record.doi.clone(),
            ground_truth_title: record.title.clone(),
            ground_truth_authors: record.authors.clone(),
            ground_truth_year: record.year,
            ground_truth_openalex_id: record.openalex_id.clone(),
            ground_truth_s2_id: record.s2_id.clone(),
            difficulty,
            degradation_type: degradation,
            metadata: GroundTruthMetadata {
                source_paper_id: record.paper_id.clone(),
                seed: Some(self.seed),
            },
        }
    }
}

/// Sample counts per difficulty and per degradation type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroundTruthDistribution {
    pub total: usize,
    pub by_difficulty: BTreeMap<Difficulty, usize>,
    pub by_degradation: BTreeMap<DegradationType, usize>,
}

impl GroundTruthDistribution {
    pub fn log(&self) {
        info!("Ground truth samples: {}", self.total);
        for (difficulty, count) in &self.by_difficulty {
            info!("  {:<8} {}", difficulty.as_str(), count);
        }
        for (degradation, count) in &self.by_degradation {
            info!("  {:<18} {}", degradation.as_str(), count);
        }
    }
}

pub fn distribution(samples: &[GroundTruthCitation]) -> GroundTruthDistribution {
    let mut dist = GroundTruthDistribution {
        total: samples.len(),
        ..Default::default()
    };
    for sample in samples {
        *dist.by_difficulty.entry(sample.difficulty).or_insert(0) += 1;
        *dist.by_degradation.entry(sample.degradation_type).or_insert(0) += 1;
    }
    dist
}

/// Write samples as a pretty-printed JSON array
pub fn save_ground_truth(path: &Path, samples: &[GroundTruthCitation]) -> Result<()> {
    write_json(path, &samples)?;
    info!("Saved {} ground truth citations to {}", samples.len(), path.display());
    Ok(())
}

pub fn load_ground_truth(path: &Path) -> Result<Vec<GroundTruthCitation>> {
    let samples: Vec<GroundTruthCitation> = read_json(path)?;
    info!("Loaded {} ground truth citations from {}", samples.len(), path.display());
    Ok(samples)
}
