use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{is_correct_match, ConfusionMatrix, MatchCriteria, Outcome};
use crate::error::MetricsInputError;
use crate::ground_truth::{DegradationType, Difficulty, GroundTruthCitation};
use crate::resolution::{ResolutionResult, ResolutionStatus};

/// Precision/recall picture of a batch, overall and per stratum
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CitationMetrics {
    pub match_criteria: MatchCriteria,
    pub overall: ConfusionMatrix,
    pub by_difficulty: BTreeMap<Difficulty, ConfusionMatrix>,
    pub by_degradation: BTreeMap<DegradationType, ConfusionMatrix>,
}

impl CitationMetrics {
    pub fn precision(&self) -> f64 {
        self.overall.precision()
    }

    pub fn recall(&self) -> f64 {
        self.overall.recall()
    }

    pub fn f1(&self) -> f64 {
        self.overall.f1()
    }

    pub fn accuracy(&self) -> f64 {
        self.overall.accuracy()
    }
}

/// One equal-width confidence bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_confidence: f64,
    pub accuracy: f64,
}

impl CalibrationBin {
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// |center - accuracy| for this bucket (0 when empty)
    pub fn gap(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.center() - self.accuracy).abs()
        }
    }
}

/// Expected Calibration Error with its per-bucket breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub ece: f64,
    pub num_bins: usize,
    pub bins: Vec<CalibrationBin>,
}

/// Metrics after rejecting results below a confidence threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdMetrics {
    pub threshold: f64,
    pub metrics: ConfusionMatrix,
    /// Fraction of results still RESOLVED at this threshold
    pub coverage: f64,
}

fn check_lengths(
    ground_truth: &[GroundTruthCitation],
    results: &[ResolutionResult],
) -> Result<(), MetricsInputError> {
    if ground_truth.len() != results.len() {
        return Err(MetricsInputError::LengthMismatch {
            ground_truth: ground_truth.len(),
            results: results.len(),
        });
    }
    Ok(())
}

/// RESOLVED and correct is a TP, RESOLVED and wrong is a FP, anything else is a FN.
///
/// Every citation has a correct answer, so there are no true negatives.
pub fn classify(gt: &GroundTruthCitation, result: &ResolutionResult, criteria: MatchCriteria) -> Outcome {
    if result.status != ResolutionStatus::Resolved {
        Outcome::FalseNegative
    } else if is_correct_match(gt, result, criteria) {
        Outcome::TruePositive
    } else {
        Outcome::FalsePositive
    }
}

/// Score `results` against `ground_truth`, pairing them by position
pub fn calculate_precision_recall_f1(
    ground_truth: &[GroundTruthCitation],
    results: &[ResolutionResult],
    criteria: MatchCriteria,
) -> Result<CitationMetrics, MetricsInputError> {
    check_lengths(ground_truth, results)?;

    let mut metrics = CitationMetrics {
        match_criteria: criteria,
        ..Default::default()
    };
    for (gt, result) in ground_truth.iter().zip(results) {
        let outcome = classify(gt, result, criteria);
        metrics.overall.record(outcome);
        metrics.by_difficulty.entry(gt.difficulty).or_default().record(outcome);
        metrics
            .by_degradation
            .entry(gt.degradation_type)
            .or_default()
            .record(outcome);
    }
    Ok(metrics)
}

/// Expected Calibration Error over `num_bins` equal-width buckets.
///
/// A result counts as correct when it is RESOLVED to the right record; its
/// confidence is taken as-is whatever the status. Each bucket contributes
/// `|bucket center - accuracy|` weighted by its share of results;
/// `mean_confidence` is reported alongside for inspection.
pub fn calculate_confidence_calibration(
    ground_truth: &[GroundTruthCitation],
    results: &[ResolutionResult],
    num_bins: usize,
    criteria: MatchCriteria,
) -> Result<CalibrationReport, MetricsInputError> {
    check_lengths(ground_truth, results)?;
    if num_bins == 0 {
        return Err(MetricsInputError::NoBins);
    }

    let mut counts = vec![0usize; num_bins];
    let mut confidence_sums = vec![0.0f64; num_bins];
    let mut correct = vec![0usize; num_bins];

    for (gt, result) in ground_truth.iter().zip(results) {
        let confidence = result.confidence_score.clamp(0.0, 1.0);
        let bin = ((confidence * num_bins as f64) as usize).min(num_bins - 1);
        counts[bin] += 1;
        confidence_sums[bin] += confidence;
        if classify(gt, result, criteria) == Outcome::TruePositive {
            correct[bin] += 1;
        }
    }

    let total = results.len();
    let width = 1.0 / num_bins as f64;
    let bins: Vec<CalibrationBin> = (0..num_bins)
        .map(|i| {
            let count = counts[i];
            let (mean_confidence, accuracy) = if count == 0 {
                (0.0, 0.0)
            } else {
                (
                    confidence_sums[i] / count as f64,
                    correct[i] as f64 / count as f64,
                )
            };
            CalibrationBin {
                lower: i as f64 * width,
                upper: (i + 1) as f64 * width,
                count,
                mean_confidence,
                accuracy,
            }
        })
        .collect();

    let ece = if total == 0 {
        0.0
    } else {
        bins.iter()
            .map(|b| (b.count as f64 / total as f64) * b.gap())
            .sum()
    };

    Ok(CalibrationReport { ece, num_bins, bins })
}

/// Operating curve: for each threshold, results below it are treated as
/// FAILED and the matrix is recomputed. Output order follows `thresholds`.
pub fn calculate_metrics_by_confidence_threshold(
    ground_truth: &[GroundTruthCitation],
    results: &[ResolutionResult],
    thresholds: &[f64],
    criteria: MatchCriteria,
) -> Result<Vec<ThresholdMetrics>, MetricsInputError> {
    check_lengths(ground_truth, results)?;

    let curve = thresholds
        .par_iter()
        .map(|&threshold| {
            let mut matrix = ConfusionMatrix::default();
            let mut accepted = 0usize;
            for (gt, result) in ground_truth.iter().zip(results) {
                let outcome = if result.is_resolved() && result.confidence_score < threshold {
                    Outcome::FalseNegative
                } else {
                    classify(gt, result, criteria)
                };
                if outcome != Outcome::FalseNegative {
                    accepted += 1;
                }
                matrix.record(outcome);
            }
            ThresholdMetrics {
                threshold,
                metrics: matrix,
                coverage: if results.is_empty() {
                    0.0
                } else {
                    accepted as f64 / results.len() as f64
                },
            }
        })
        .collect();

    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::matching::tests::{ground_truth, resolved};
    use crate::resolution::MatchedRecord;

    fn doi_record(doi: &str) -> MatchedRecord {
        MatchedRecord {
            doi: Some(doi.to_string()),
            ..Default::default()
        }
    }

    fn abc() -> (Vec<GroundTruthCitation>, Vec<ResolutionResult>) {
        let a = ground_truth(Some("10.1/a"), "Alpha", "Doe, A");
        let b = ground_truth(Some("10.1/b"), "Beta", "Doe, B");
        let c = ground_truth(Some("10.1/c"), "Gamma", "Doe, C");
        let results = vec![
            resolved(&a, doi_record("10.1/a"), 0.9),
            resolved(&b, doi_record("10.1/zzz"), 0.6),
            ResolutionResult::unresolved(c.citation.clone(), vec![]),
        ];
        (vec![a, b, c], results)
    }

    #[test]
    fn test_tp_fp_fn_gives_half() {
        let (gt, results) = abc();
        let metrics = calculate_precision_recall_f1(&gt, &results, MatchCriteria::Doi).unwrap();

        assert_eq!(metrics.overall, ConfusionMatrix::new(1, 1, 0, 1));
        assert!((metrics.precision() - 0.5).abs() < 1e-12);
        assert!((metrics.recall() - 0.5).abs() < 1e-12);
        assert!((metrics.f1() - 0.5).abs() < 1e-12);
        assert_eq!(metrics.by_difficulty[&Difficulty::Easy].total(), 3);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let (gt, results) = abc();
        let err = calculate_precision_recall_f1(&gt, &results[..2], MatchCriteria::Any).unwrap_err();
        assert_eq!(
            err,
            MetricsInputError::LengthMismatch {
                ground_truth: 3,
                results: 2
            }
        );
    }

    /// `n` results at `confidence`, the first `correct` of them right
    fn bucket(
        prefix: &str,
        n: usize,
        correct: usize,
        confidence: f64,
    ) -> (Vec<GroundTruthCitation>, Vec<ResolutionResult>) {
        let gts: Vec<GroundTruthCitation> = (0..n)
            .map(|i| ground_truth(Some(format!("10.1/{}{}", prefix, i).as_str()), "T", "X"))
            .collect();
        let results = gts
            .iter()
            .enumerate()
            .map(|(i, gt)| {
                let doi = if i < correct { gt.ground_truth_doi.clone().unwrap() } else { "10.1/wrong".to_string() };
                resolved(gt, doi_record(&doi), confidence)
            })
            .collect();
        (gts, results)
    }

    #[test]
    fn test_perfect_calibration_has_zero_ece() {
        // bucket [0.5, 0.6): 20 results, 11 correct (accuracy 0.55 = center)
        // bucket [0.9, 1.0]: 20 results, 19 correct (accuracy 0.95 = center)
        let (mut gts, mut results) = bucket("a", 20, 11, 0.55);
        let (more_gts, more_results) = bucket("b", 20, 19, 0.97);
        gts.extend(more_gts);
        results.extend(more_results);

        let report = calculate_confidence_calibration(&gts, &results, 10, MatchCriteria::Doi).unwrap();
        assert!(report.ece.abs() < 1e-12, "ece = {}", report.ece);
        assert_eq!(report.bins.len(), 10);
        assert_eq!(report.bins[5].count, 20);
        assert_eq!(report.bins[9].count, 20);
        assert!((report.bins[9].mean_confidence - 0.97).abs() < 1e-12);
    }

    #[test]
    fn test_ece_measured_from_bucket_center() {
        // All at 0.5 with half correct: bucket [0.5, 0.6) has center 0.55
        let (gts, results) = bucket("c", 2, 1, 0.5);
        let report = calculate_confidence_calibration(&gts, &results, 10, MatchCriteria::Doi).unwrap();

        assert!((report.bins[5].center() - 0.55).abs() < 1e-12);
        assert!((report.bins[5].accuracy - 0.5).abs() < 1e-12);
        assert!((report.ece - 0.05).abs() < 1e-12, "ece = {}", report.ece);
    }

    #[test]
    fn test_overconfident_ece() {
        // Top bucket of five is [0.8, 1.0], center 0.9
        let a = ground_truth(Some("10.1/a"), "A", "X");
        let results = vec![resolved(&a, doi_record("10.1/wrong"), 1.0)];
        let report = calculate_confidence_calibration(&[a], &results, 5, MatchCriteria::Doi).unwrap();
        assert!((report.ece - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let (gt, results) = abc();
        let err = calculate_confidence_calibration(&gt, &results, 0, MatchCriteria::Any).unwrap_err();
        assert_eq!(err, MetricsInputError::NoBins);
    }

    #[test]
    fn test_recall_non_increasing_in_threshold() {
        let gts: Vec<GroundTruthCitation> = (0..20)
            .map(|i| ground_truth(Some(format!("10.1/{}", i).as_str()), "T", "X"))
            .collect();
        let results: Vec<ResolutionResult> = gts
            .iter()
            .enumerate()
            .map(|(i, gt)| {
                let doi = if i % 3 == 0 { "10.1/wrong".to_string() } else { format!("10.1/{}", i) };
                resolved(gt, doi_record(&doi), i as f64 / 20.0)
            })
            .collect();

        let thresholds: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        let curve =
            calculate_metrics_by_confidence_threshold(&gts, &results, &thresholds, MatchCriteria::Doi).unwrap();

        assert_eq!(curve.len(), thresholds.len());
        for (point, t) in curve.iter().zip(&thresholds) {
            assert_eq!(point.threshold, *t);
        }
        for pair in curve.windows(2) {
            assert!(pair[1].metrics.recall() <= pair[0].metrics.recall());
            assert!(pair[1].coverage <= pair[0].coverage);
        }
        assert_eq!(curve[0].coverage, 1.0);
    }
}
