use serde::{Deserialize, Serialize};
use std::fmt;

/// A bibliographic reference as seen by a resolver.
///
/// Values are built once and never mutated; degraded variants are new values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub raw_text: String,
}

impl Citation {
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        year: Option<i32>,
        journal: Option<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            year,
            journal,
            raw_text: raw_text.into(),
        }
    }

    /// Build a citation whose raw text is rendered from the structured fields
    /// as `Authors (Year). Title. Journal.`
    pub fn from_parts(
        title: impl Into<String>,
        authors: Vec<String>,
        year: Option<i32>,
        journal: Option<String>,
    ) -> Self {
        let title = title.into();
        let raw_text = render_raw_text(&title, &authors, year, journal.as_deref());
        Self::new(title, authors, year, journal, raw_text)
    }
}

fn render_raw_text(title: &str, authors: &[String], year: Option<i32>, journal: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    let mut head = authors.join(", ");
    if let Some(year) = year {
        if head.is_empty() {
            head = format!("({})", year);
        } else {
            head = format!("{} ({})", head, year);
        }
    }
    if !head.is_empty() {
        parts.push(head);
    }
    if !title.is_empty() {
        parts.push(title.to_string());
    }
    if let Some(journal) = journal.filter(|j| !j.is_empty()) {
        parts.push(journal.to_string());
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("{}.", parts.join(". "))
    }
}

/// Outcome of one resolution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Resolved,
    Failed,
    Unresolved,
    Ambiguous,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::Failed => "failed",
            ResolutionStatus::Unresolved => "unresolved",
            ResolutionStatus::Ambiguous => "ambiguous",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse bucket of a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl ConfidenceLevel {
    pub const HIGH_THRESHOLD: f64 = 0.8;
    pub const MEDIUM_THRESHOLD: f64 = 0.5;

    /// Bucket a score; monotonic in `score`
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// External identifier service that produced (or was asked for) a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Crossref,
    Unpaywall,
    Arxiv,
    SemanticScholar,
    Openalex,
    DoiOrg,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Crossref => "crossref",
            ResolutionSource::Unpaywall => "unpaywall",
            ResolutionSource::Arxiv => "arxiv",
            ResolutionSource::SemanticScholar => "semantic_scholar",
            ResolutionSource::Openalex => "openalex",
            ResolutionSource::DoiOrg => "doi_org",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields of the canonical record a citation resolved to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s2_id: Option<String>,
}

/// Bookkeeping attached to every result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionMetadata {
    #[serde(default)]
    pub api_sources_tried: Vec<ResolutionSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Short label of the failure (`timeout`, `failure`, `cancelled`), used to
    /// bucket errors in statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Resolver attempts made for this result (0 for cache hits)
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub resolution_time_ms: u64,
}

/// The result of resolving one citation.
///
/// Never mutated after construction; use [`ResolutionResult::with_status`]
/// and friends to derive a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub citation: Citation,
    pub status: ResolutionStatus,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolutionSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_data: Option<MatchedRecord>,
    #[serde(default)]
    pub metadata: ResolutionMetadata,
}

impl ResolutionResult {
    pub fn new(citation: Citation, status: ResolutionStatus, confidence_score: f64) -> Self {
        let confidence_score = clamp_confidence(confidence_score);
        Self {
            citation,
            status,
            confidence_score,
            confidence_level: ConfidenceLevel::from_score(confidence_score),
            source: None,
            matched_data: None,
            metadata: ResolutionMetadata::default(),
        }
    }

    /// A successful match from `source`
    pub fn resolved(
        citation: Citation,
        source: ResolutionSource,
        matched: MatchedRecord,
        confidence_score: f64,
    ) -> Self {
        let mut result = Self::new(citation, ResolutionStatus::Resolved, confidence_score);
        result.source = Some(source);
        result.matched_data = Some(matched);
        result.metadata.api_sources_tried.push(source);
        result
    }

    /// No source produced a match
    pub fn unresolved(citation: Citation, sources_tried: Vec<ResolutionSource>) -> Self {
        let mut result = Self::new(citation, ResolutionStatus::Unresolved, 0.0);
        result.metadata.api_sources_tried = sources_tried;
        result
    }

    /// Resolution could not be completed
    pub fn failed(citation: Citation, error_message: impl Into<String>) -> Self {
        let mut result = Self::new(citation, ResolutionStatus::Failed, 0.0);
        result.metadata.error_message = Some(error_message.into());
        result
    }

    /// Failed result tagged with a short error label
    pub fn failed_with_kind(
        citation: Citation,
        kind: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let mut result = Self::failed(citation, error_message);
        result.metadata.error_kind = Some(kind.into());
        result
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }

    /// Copy of this result with a different status (confidence kept)
    pub fn with_status(&self, status: ResolutionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Copy of this result with replaced metadata
    pub fn with_metadata(self, metadata: ResolutionMetadata) -> Self {
        Self { metadata, ..self }
    }
}

fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Citation {
        Citation::from_parts(
            "Attention Is All You Need",
            vec!["Vaswani, Ashish".to_string(), "Shazeer, Noam".to_string()],
            Some(2017),
            Some("NeurIPS".to_string()),
        )
    }

    #[test]
    fn test_raw_text_rendering() {
        let c = sample();
        assert_eq!(
            c.raw_text,
            "Vaswani, Ashish, Shazeer, Noam (2017). Attention Is All You Need. NeurIPS."
        );

        let bare = Citation::from_parts("Only a title", vec![], None, None);
        assert_eq!(bare.raw_text, "Only a title.");

        let no_authors = Citation::from_parts("T", vec![], Some(1999), None);
        assert_eq!(no_authors.raw_text, "(1999). T.");
    }

    #[test]
    fn test_confidence_level_is_monotonic() {
        let mut last = ConfidenceLevel::Low;
        for i in 0..=100 {
            let level = ConfidenceLevel::from_score(i as f64 / 100.0);
            assert!(level >= last);
            last = level;
        }
        assert_eq!(ConfidenceLevel::from_score(0.49), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.8), ConfidenceLevel::High);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let r = ResolutionResult::new(sample(), ResolutionStatus::Resolved, 1.7);
        assert_eq!(r.confidence_score, 1.0);
        let r = ResolutionResult::new(sample(), ResolutionStatus::Resolved, f64::NAN);
        assert_eq!(r.confidence_score, 0.0);
        assert_eq!(r.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_with_status_leaves_original_untouched() {
        let original = ResolutionResult::resolved(
            sample(),
            ResolutionSource::Crossref,
            MatchedRecord {
                doi: Some("10.1234/x".to_string()),
                ..Default::default()
            },
            0.9,
        );
        let forced = original.with_status(ResolutionStatus::Failed);
        assert_eq!(original.status, ResolutionStatus::Resolved);
        assert_eq!(forced.status, ResolutionStatus::Failed);
        assert_eq!(forced.confidence_score, 0.9);
    }

    #[test]
    fn test_result_serialization() {
        let r = ResolutionResult::resolved(
            sample(),
            ResolutionSource::SemanticScholar,
            MatchedRecord::default(),
            0.75,
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["source"], "semantic_scholar");
        assert_eq!(json["confidence_level"], "medium");

        let back: ResolutionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_failed_with_kind() {
        let r = ResolutionResult::failed_with_kind(sample(), "timeout", "Resolution timed out after 5.0s");
        assert_eq!(r.status, ResolutionStatus::Failed);
        assert_eq!(r.metadata.error_kind.as_deref(), Some("timeout"));

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["metadata"]["error_kind"], "timeout");
        let plain = serde_json::to_value(ResolutionResult::failed(sample(), "x")).unwrap();
        assert!(plain["metadata"].get("error_kind").is_none());
    }

    #[test]
    fn test_citation_deserializes_with_missing_optional_fields() {
        let c: Citation = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        assert!(c.authors.is_empty());
        assert_eq!(c.year, None);
        assert_eq!(c.raw_text, "");
    }
}
