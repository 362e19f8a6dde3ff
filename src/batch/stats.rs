use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::resolution::{ResolutionResult, ResolutionSource};

/// Running counters for one `process_batch` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_citations: usize,
    pub processed_citations: usize,
    pub successful_resolutions: usize,
    pub failed_resolutions: usize,
    pub cache_hits: usize,
    /// Results taken over from a checkpoint instead of being resolved again
    pub resumed_from_checkpoint: usize,
    pub retries: usize,
    pub api_calls: BTreeMap<ResolutionSource, usize>,
    /// Unsuccessful results by error kind, or by status when there is none
    pub errors_by_type: BTreeMap<String, usize>,
    pub checkpoints_saved: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub processing_time_seconds: f64,
    pub average_time_per_citation: f64,
}

impl BatchStatistics {
    pub fn new(total_citations: usize) -> Self {
        Self {
            total_citations,
            processed_citations: 0,
            successful_resolutions: 0,
            failed_resolutions: 0,
            cache_hits: 0,
            resumed_from_checkpoint: 0,
            retries: 0,
            api_calls: BTreeMap::new(),
            errors_by_type: BTreeMap::new(),
            checkpoints_saved: 0,
            start_time: OffsetDateTime::now_utc(),
            end_time: None,
            processing_time_seconds: 0.0,
            average_time_per_citation: 0.0,
        }
    }

    /// Fold one finished result into the counters
    pub fn update_from_result(&mut self, result: &ResolutionResult) {
        self.processed_citations += 1;

        if result.is_resolved() {
            self.successful_resolutions += 1;
            if let Some(source) = result.source {
                *self.api_calls.entry(source).or_insert(0) += 1;
            }
        } else {
            self.failed_resolutions += 1;
            let bucket = result
                .metadata
                .error_kind
                .clone()
                .unwrap_or_else(|| result.status.as_str().to_string());
            *self.errors_by_type.entry(bucket).or_insert(0) += 1;
        }
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_resumed(&mut self) {
        self.resumed_from_checkpoint += 1;
    }

    pub fn record_retries(&mut self, retries: usize) {
        self.retries += retries;
    }

    pub fn record_checkpoint(&mut self) {
        self.checkpoints_saved += 1;
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Stamp the end time and derive timing fields. Only the first call has an effect.
    pub fn finalize(&mut self) {
        if self.is_finalized() {
            return;
        }
        let end = OffsetDateTime::now_utc();
        self.end_time = Some(end);
        self.processing_time_seconds = (end - self.start_time).as_seconds_f64().max(0.0);
        self.average_time_per_citation = if self.processed_citations > 0 {
            self.processing_time_seconds / self.processed_citations as f64
        } else {
            0.0
        };
    }

    /// Percentage of processed citations that resolved
    pub fn success_rate(&self) -> f64 {
        if self.processed_citations == 0 {
            0.0
        } else {
            self.successful_resolutions as f64 / self.processed_citations as f64 * 100.0
        }
    }

    /// JSON view with derived fields, as stored in checkpoints and reports
    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("success_rate".to_string(), Value::from(self.success_rate()));
        }
        value
    }
}

impl Default for BatchStatistics {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::{Citation, MatchedRecord, ResolutionStatus};

    fn citation() -> Citation {
        Citation::from_parts("A title", vec![], Some(2020), None)
    }

    #[test]
    fn test_update_from_resolved_result() {
        let mut stats = BatchStatistics::new(2);
        let result = ResolutionResult::resolved(
            citation(),
            ResolutionSource::Crossref,
            MatchedRecord::default(),
            0.9,
        );
        stats.update_from_result(&result);

        assert_eq!(stats.processed_citations, 1);
        assert_eq!(stats.successful_resolutions, 1);
        assert_eq!(stats.api_calls.get(&ResolutionSource::Crossref), Some(&1));
        assert!(stats.errors_by_type.is_empty());
    }

    #[test]
    fn test_update_from_unresolved_results() {
        let mut stats = BatchStatistics::new(3);
        stats.update_from_result(&ResolutionResult::failed_with_kind(citation(), "timeout", "after 1.0s"));
        stats.update_from_result(&ResolutionResult::failed_with_kind(citation(), "timeout", "after 2.0s"));
        stats.update_from_result(&ResolutionResult::failed(citation(), "no kind"));
        stats.update_from_result(&ResolutionResult::new(
            citation(),
            ResolutionStatus::Ambiguous,
            0.4,
        ));

        assert_eq!(stats.failed_resolutions, 4);
        assert_eq!(stats.errors_by_type.len(), 3);
        assert_eq!(stats.errors_by_type.get("timeout"), Some(&2));
        assert_eq!(stats.errors_by_type.get("failed"), Some(&1));
        assert_eq!(stats.errors_by_type.get("ambiguous"), Some(&1));
    }

    #[test]
    fn test_finalize_derives_timing_once() {
        let mut stats = BatchStatistics::new(0);
        stats.finalize();
        assert!(stats.is_finalized());
        assert_eq!(stats.average_time_per_citation, 0.0);

        let end = stats.end_time;
        stats.finalize();
        assert_eq!(stats.end_time, end);
    }

    #[test]
    fn test_success_rate_in_json() {
        let mut stats = BatchStatistics::new(4);
        for i in 0..4 {
            let result = if i < 3 {
                ResolutionResult::resolved(citation(), ResolutionSource::Openalex, MatchedRecord::default(), 1.0)
            } else {
                ResolutionResult::failed(citation(), "x")
            };
            stats.update_from_result(&result);
        }
        stats.finalize();

        let json = stats.to_json();
        assert_eq!(json["success_rate"], 75.0);
        assert_eq!(json["api_calls"]["openalex"], 3);
        assert!(json["end_time"].is_string());

        let back: BatchStatistics = serde_json::from_value(json).unwrap();
        assert_eq!(back.successful_resolutions, 3);
    }

    #[test]
    fn test_success_rate_without_results() {
        assert_eq!(BatchStatistics::new(10).success_rate(), 0.0);
    }
}
