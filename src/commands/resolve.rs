use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use citation_resolution::batch::{BatchCitationProcessor, BatchConfig, BatchOptions};
use citation_resolution::common::{
    create_count_progress_bar, format_elapsed, read_json, setup_logging, ResolutionRun, ResolveStats,
};
use citation_resolution::resolution::{Citation, DoiResolver};

use crate::cli::ResolveArgs;

/// Batch options from the optional config file, overridden by CLI flags
fn build_options(args: &ResolveArgs) -> Result<BatchOptions> {
    let mut options = match &args.config {
        Some(path) => read_json::<BatchOptions>(path)
            .with_context(|| format!("Failed to load batch config: {}", path.display()))?,
        None => BatchOptions::default(),
    };

    if let Some(chunk_size) = args.chunk_size {
        options.chunk_size = chunk_size;
    }
    if let Some(concurrency) = args.concurrency {
        options.max_concurrent = concurrency;
    }
    if let Some(checkpoint) = &args.checkpoint {
        options.checkpoint_path = Some(checkpoint.clone());
    }
    if let Some(interval) = args.checkpoint_interval {
        options.checkpoint_interval = interval;
    }
    if let Some(timeout) = args.timeout {
        options.timeout_seconds = timeout;
    }
    if let Some(retries) = args.retries {
        options.retry_attempts = retries;
    }
    if let Some(delay) = args.retry_delay {
        options.retry_delay_seconds = delay;
    }
    if let Some(backoff) = args.retry_backoff {
        options.retry_backoff = backoff;
    }
    for (source, rate) in &args.rate_limit {
        options.rate_limits.insert(*source, *rate);
    }
    if args.no_cache {
        options.enable_caching = false;
    }

    Ok(options)
}

pub async fn run_resolve_async(args: ResolveArgs) -> Result<ResolveStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    let config = BatchConfig::try_from(build_options(&args)?)?;

    info!("Starting batch citation resolution");
    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());
    info!("Chunk size: {}", config.chunk_size());
    info!("Concurrency: {}", config.max_concurrent());
    info!("Timeout: {}s", config.timeout_seconds());
    if let Some(path) = config.checkpoint_path() {
        info!("Checkpoint: {} (every {} citations)", path.display(), config.checkpoint_interval());
    }

    let citations: Vec<Citation> = read_json(&args.input)?;
    info!("Loaded {} citations", citations.len());

    let resolver = DoiResolver::new(Duration::from_secs_f64(config.timeout_seconds()))?;
    let progress = create_count_progress_bar(citations.len() as u64);
    let mut processor = BatchCitationProcessor::new(Arc::new(resolver), config)?.with_progress(progress);

    let token = processor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current chunk");
            token.cancel();
        }
    });

    let results = processor.process_batch(&citations).await;

    let statistics = processor.statistics();
    ResolutionRun {
        results,
        statistics: Some(statistics.to_json()),
    }
    .save(&args.output)?;

    let stats = ResolveStats {
        total_citations: statistics.total_citations,
        resolved: statistics.successful_resolutions,
        failed: statistics.failed_resolutions,
        cache_hits: statistics.cache_hits,
        checkpoints_saved: statistics.checkpoints_saved,
    };

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Citations: {}", stats.total_citations);
    info!("Resolved: {} ({:.1}%)", stats.resolved, statistics.success_rate());
    info!("Failed: {}", stats.failed);
    info!("Cache hits: {}", stats.cache_hits);
    info!("Resumed from checkpoint: {}", statistics.resumed_from_checkpoint);
    info!("Checkpoints saved: {}", stats.checkpoints_saved);
    for (error, count) in &statistics.errors_by_type {
        info!("  {}: {}", error, count);
    }
    info!("Output: {}", args.output.display());
    info!("========================================================");

    Ok(stats)
}

pub fn run_resolve(args: ResolveArgs) -> Result<ResolveStats> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_resolve_async(args))
}
