use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::batch::normalize_text;
use crate::ground_truth::GroundTruthCitation;
use crate::resolution::{dois_match, MatchedRecord, ResolutionResult};

/// Minimum normalized title similarity for a title/author match
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.9;

/// How a resolved record is judged against ground truth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriteria {
    /// Normalized DOIs must be equal
    Doi,
    /// Similar title and same primary author surname
    TitleAuthor,
    /// First identifier present on both sides (DOI, OpenAlex, S2), else title/author
    #[default]
    Any,
}

impl MatchCriteria {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchCriteria::Doi => "doi",
            MatchCriteria::TitleAuthor => "title_author",
            MatchCriteria::Any => "any",
        }
    }
}

impl fmt::Display for MatchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchCriteria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "doi" => Ok(MatchCriteria::Doi),
            "title_author" => Ok(MatchCriteria::TitleAuthor),
            "any" => Ok(MatchCriteria::Any),
            other => Err(format!(
                "unknown match criteria '{}' (expected doi, title_author or any)",
                other
            )),
        }
    }
}

/// Normalized Levenshtein similarity of two titles after text normalization.
///
/// Empty titles never match anything.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Surname of an author in either "Last, First" or "First Last" order
pub fn normalize_author(name: &str) -> String {
    let family = match name.split_once(',') {
        Some((family, _)) => family,
        None => name.split_whitespace().last().unwrap_or(""),
    };
    normalize_text(family)
}

fn normalize_openalex(id: &str) -> String {
    let id = id.trim().to_lowercase();
    id.strip_prefix("https://openalex.org/")
        .map(String::from)
        .unwrap_or(id)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn title_author_match(gt: &GroundTruthCitation, matched: &MatchedRecord) -> bool {
    let Some(title) = non_empty(&matched.title) else {
        return false;
    };
    if title_similarity(&gt.ground_truth_title, title) < TITLE_SIMILARITY_THRESHOLD {
        return false;
    }
    // without authors on both sides the title alone decides
    match (gt.ground_truth_authors.first(), matched.authors.first()) {
        (Some(expected), Some(found)) => {
            let expected = normalize_author(expected);
            !expected.is_empty() && expected == normalize_author(found)
        }
        _ => true,
    }
}

/// Whether the record matched by `result` is the ground-truth paper
pub fn is_correct_match(gt: &GroundTruthCitation, result: &ResolutionResult, criteria: MatchCriteria) -> bool {
    let Some(matched) = result.matched_data.as_ref() else {
        return false;
    };

    let doi_pair = non_empty(&gt.ground_truth_doi).zip(non_empty(&matched.doi));

    match criteria {
        MatchCriteria::Doi => doi_pair.is_some_and(|(a, b)| dois_match(a, b)),
        MatchCriteria::TitleAuthor => title_author_match(gt, matched),
        MatchCriteria::Any => {
            if let Some((a, b)) = doi_pair {
                return dois_match(a, b);
            }
            if let Some((a, b)) = non_empty(&gt.ground_truth_openalex_id).zip(non_empty(&matched.openalex_id)) {
                return normalize_openalex(a) == normalize_openalex(b);
            }
            if let Some((a, b)) = non_empty(&gt.ground_truth_s2_id).zip(non_empty(&matched.s2_id)) {
                return a.eq_ignore_ascii_case(b);
            }
            title_author_match(gt, matched)
        }
    }
}
