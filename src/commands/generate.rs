use anyhow::Result;
use log::info;
use std::time::Instant;

use citation_resolution::common::{format_elapsed, setup_logging, GenerateStats};
use citation_resolution::ground_truth::{
    distribution, load_corpus, save_ground_truth, GenerationOptions, GroundTruthGenerator,
};

use crate::cli::GenerateArgs;

pub fn run_generate(args: GenerateArgs) -> Result<GenerateStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting ground truth generation");
    info!("Corpus: {}", args.corpus.display());
    info!("Output: {}", args.output.display());
    info!("Samples: {} (seed {})", args.num_samples, args.seed);

    let generator = GroundTruthGenerator::new(load_corpus(&args.corpus)?, args.seed);
    let corpus_records = generator.corpus_len();
    let samples = generator.generate_from_corpus(&GenerationOptions {
        num_samples: args.num_samples,
        stratify_by_difficulty: args.stratify,
        require_doi: args.require_doi,
        require_cross_validation: args.require_cross_validation,
    });

    save_ground_truth(&args.output, &samples)?;

    let stats = GenerateStats {
        corpus_records,
        samples_generated: samples.len(),
    };

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Corpus records: {}", stats.corpus_records);
    distribution(&samples).log();
    info!("Output: {}", args.output.display());
    info!("========================================================");

    Ok(stats)
}
