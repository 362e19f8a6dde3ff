//! Synthetic ground truth: canonical corpus records turned into degraded
//! citations paired with their known-correct identifiers.

pub mod corpus;
pub mod degrade;
pub mod generator;

pub use corpus::*;
pub use degrade::*;
pub use generator::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::resolution::Citation;

/// How hard a degraded citation is expected to be to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Degradations that produce citations of this difficulty
    pub fn degradations(&self) -> &'static [DegradationType] {
        match self {
            Difficulty::Easy => &[DegradationType::Clean, DegradationType::AuthorVariation],
            Difficulty::Medium => &[
                DegradationType::TitleTruncation,
                DegradationType::JournalMissing,
                DegradationType::AuthorVariation,
            ],
            Difficulty::Hard => &[
                DegradationType::MissingYear,
                DegradationType::MissingAuthors,
                DegradationType::Typos,
            ],
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transform applied to a clean citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationType {
    Clean,
    AuthorVariation,
    TitleTruncation,
    MissingYear,
    MissingAuthors,
    Typos,
    JournalMissing,
}

impl DegradationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationType::Clean => "clean",
            DegradationType::AuthorVariation => "author_variation",
            DegradationType::TitleTruncation => "title_truncation",
            DegradationType::MissingYear => "missing_year",
            DegradationType::MissingAuthors => "missing_authors",
            DegradationType::Typos => "typos",
            DegradationType::JournalMissing => "journal_missing",
        }
    }
}

impl fmt::Display for DegradationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provenance of a generated sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthMetadata {
    pub source_paper_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// A degraded citation together with the canonical record it came from.
///
/// `citation` is what a resolver sees; the `ground_truth_*` fields are what
/// correctness is measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthCitation {
    #[serde(flatten)]
    pub citation: Citation,
    #[serde(default)]
    pub ground_truth_doi: Option<String>,
    pub ground_truth_title: String,
    #[serde(default)]
    pub ground_truth_authors: Vec<String>,
    #[serde(default)]
    pub ground_truth_year: Option<i32>,
    #[serde(default)]
    pub ground_truth_openalex_id: Option<String>,
    #[serde(default)]
    pub ground_truth_s2_id: Option<String>,
    pub difficulty: Difficulty,
    pub degradation_type: DegradationType,
    #[serde(default)]
    pub metadata: GroundTruthMetadata,
}

impl GroundTruthCitation {
    pub fn source_paper_id(&self) -> &str {
        &self.metadata.source_paper_id
    }
}
