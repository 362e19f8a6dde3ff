use anyhow::{bail, Result};
use log::{info, warn};
use std::time::Instant;

use citation_resolution::common::{format_elapsed, setup_logging, write_json, EvaluateStats, ResolutionRun};
use citation_resolution::ground_truth::load_ground_truth;
use citation_resolution::metrics::EvaluationReport;

use crate::cli::EvaluateArgs;

pub fn run_evaluate(args: EvaluateArgs) -> Result<EvaluateStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting evaluation");
    info!("Ground truth: {}", args.ground_truth.display());
    info!("Results: {}", args.results.display());
    info!("Match criteria: {}", args.match_criteria);

    for threshold in &args.thresholds {
        if !(0.0..=1.0).contains(threshold) {
            bail!("Threshold {} is outside [0, 1]", threshold);
        }
    }

    let ground_truth = load_ground_truth(&args.ground_truth)?;
    let run = ResolutionRun::load(&args.results)?;
    if run.statistics.is_none() {
        warn!("Results file carries no batch statistics");
    }

    let report = EvaluationReport::build(
        &ground_truth,
        &run.results,
        args.match_criteria,
        args.bins,
        &args.thresholds,
        run.statistics,
    )?;
    report.log_summary();

    if let Some(output) = &args.output {
        write_json(output, &report)?;
        info!("Report written to {}", output.display());
    }

    let stats = EvaluateStats {
        citations_evaluated: report.num_citations,
        precision: report.metrics.precision(),
        recall: report.metrics.recall(),
        f1: report.metrics.f1(),
        ece: report.calibration.ece,
    };

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Citations evaluated: {}", stats.citations_evaluated);
    info!("Precision {:.4} | Recall {:.4} | F1 {:.4} | ECE {:.4}", stats.precision, stats.recall, stats.f1, stats.ece);
    info!("========================================================");

    Ok(stats)
}
