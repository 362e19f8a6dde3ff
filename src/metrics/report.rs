use log::info;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use super::{
    calculate_confidence_calibration, calculate_metrics_by_confidence_threshold,
    calculate_precision_recall_f1, CalibrationReport, CitationMetrics, MatchCriteria, ThresholdMetrics,
};
use crate::error::MetricsInputError;
use crate::ground_truth::GroundTruthCitation;
use crate::resolution::ResolutionResult;

/// Default operating points for the threshold curve
pub const DEFAULT_THRESHOLDS: &[f64] = &[0.5, 0.6, 0.7, 0.8, 0.9];

/// Everything the evaluate command reports for one run
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub num_citations: usize,
    pub metrics: CitationMetrics,
    pub calibration: CalibrationReport,
    pub thresholds: Vec<ThresholdMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_statistics: Option<Value>,
}

impl EvaluationReport {
    pub fn build(
        ground_truth: &[GroundTruthCitation],
        results: &[ResolutionResult],
        criteria: MatchCriteria,
        num_bins: usize,
        thresholds: &[f64],
        batch_statistics: Option<Value>,
    ) -> Result<Self, MetricsInputError> {
        Ok(Self {
            generated_at: OffsetDateTime::now_utc(),
            num_citations: results.len(),
            metrics: calculate_precision_recall_f1(ground_truth, results, criteria)?,
            calibration: calculate_confidence_calibration(ground_truth, results, num_bins, criteria)?,
            thresholds: calculate_metrics_by_confidence_threshold(ground_truth, results, thresholds, criteria)?,
            batch_statistics,
        })
    }

    pub fn log_summary(&self) {
        let overall = &self.metrics.overall;

        info!("");
        info!("==================== EVALUATION SUMMARY ====================");
        info!("Citations evaluated: {}", self.num_citations);
        info!("Match criteria: {}", self.metrics.match_criteria);
        info!(
            "TP: {}  FP: {}  FN: {}",
            overall.true_positives, overall.false_positives, overall.false_negatives
        );
        info!("Precision: {:.4}", overall.precision());
        info!("Recall:    {:.4}", overall.recall());
        info!("F1:        {:.4}", overall.f1());
        info!("ECE ({} bins): {:.4}", self.calibration.num_bins, self.calibration.ece);

        info!("");
        info!("By difficulty:");
        for (difficulty, m) in &self.metrics.by_difficulty {
            info!(
                "  {:<8} n={:<6} P={:.3} R={:.3} F1={:.3}",
                difficulty.as_str(),
                m.total(),
                m.precision(),
                m.recall(),
                m.f1()
            );
        }

        info!("By degradation:");
        for (degradation, m) in &self.metrics.by_degradation {
            info!(
                "  {:<18} n={:<6} P={:.3} R={:.3} F1={:.3}",
                degradation.as_str(),
                m.total(),
                m.precision(),
                m.recall(),
                m.f1()
            );
        }

        if !self.thresholds.is_empty() {
            info!("");
            info!("Threshold curve:");
            for point in &self.thresholds {
                info!(
                    "  >= {:.2}  coverage={:.3} P={:.3} R={:.3} F1={:.3}",
                    point.threshold,
                    point.coverage,
                    point.metrics.precision(),
                    point.metrics.recall(),
                    point.metrics.f1()
                );
            }
        }
        info!("=============================================================");
    }
}
