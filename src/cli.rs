use clap::{Parser, Subcommand};
use std::path::PathBuf;

use citation_resolution::batch::Backoff;
use citation_resolution::metrics::MatchCriteria;
use citation_resolution::resolution::ResolutionSource;

#[derive(Parser)]
#[command(name = "citation-resolution")]
#[command(about = "Resolve citations in batches and evaluate resolution quality against synthetic ground truth")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate degraded ground-truth citations from a corpus of canonical records
    Generate(GenerateArgs),

    /// Resolve a JSON array of citations through the batch engine (doi.org HEAD checks)
    Resolve(ResolveArgs),

    /// Score resolution results against ground truth
    Evaluate(EvaluateArgs),
}

#[derive(Parser, Clone)]
pub struct GenerateArgs {
    /// Corpus of canonical records (JSONL, optionally .gz)
    #[arg(short, long, required = true)]
    pub corpus: PathBuf,

    /// Output ground truth JSON file
    #[arg(short, long, default_value = "ground_truth.json")]
    pub output: PathBuf,

    /// Number of citations to generate
    #[arg(short, long, default_value = "100")]
    pub num_samples: usize,

    /// Seed for the random number generator
    #[arg(short, long, default_value = "42")]
    pub seed: u64,

    /// Cycle difficulties easy/medium/hard instead of drawing them at random
    #[arg(long, default_value = "false")]
    pub stratify: bool,

    /// Only use records that have a DOI
    #[arg(long, default_value = "false")]
    pub require_doi: bool,

    /// Only use records whose DOI is backed by an OpenAlex or Semantic Scholar id
    #[arg(long, default_value = "false")]
    pub require_cross_validation: bool,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone)]
pub struct ResolveArgs {
    /// Input JSON array of citations (ground truth files work as-is)
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Output JSON file with results and batch statistics
    #[arg(short, long, default_value = "results.json")]
    pub output: PathBuf,

    /// JSON file with batch options; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Citations per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum in-flight resolutions
    #[arg(short = 'C', long)]
    pub concurrency: Option<usize>,

    /// Checkpoint file for resuming interrupted runs
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Save a checkpoint every N completed citations (0 = only at the end)
    #[arg(long)]
    pub checkpoint_interval: Option<i64>,

    /// Timeout in seconds per resolution attempt
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Retries after a failed attempt
    #[arg(long)]
    pub retries: Option<u32>,

    /// Base delay in seconds between retries
    #[arg(long)]
    pub retry_delay: Option<f64>,

    /// How the retry delay grows (constant, linear, exponential)
    #[arg(long, value_parser = parse_backoff)]
    pub retry_backoff: Option<Backoff>,

    /// Requests per second for a source, e.g. doi_org=5 (repeatable)
    #[arg(long, value_parser = parse_rate_limit)]
    pub rate_limit: Vec<(ResolutionSource, f64)>,

    /// Disable the in-memory result cache
    #[arg(long, default_value = "false")]
    pub no_cache: bool,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone)]
pub struct EvaluateArgs {
    /// Ground truth JSON file from the generate step
    #[arg(short, long, required = true)]
    pub ground_truth: PathBuf,

    /// Results JSON file from the resolve step
    #[arg(short, long, required = true)]
    pub results: PathBuf,

    /// How a resolved record is matched to ground truth (any, doi, title_author)
    #[arg(short, long, default_value = "any")]
    pub match_criteria: MatchCriteria,

    /// Number of confidence buckets for calibration
    #[arg(short, long, default_value = "10")]
    pub bins: usize,

    /// Confidence thresholds for the operating curve
    #[arg(short, long, value_delimiter = ',', default_value = "0.5,0.6,0.7,0.8,0.9")]
    pub thresholds: Vec<f64>,

    /// Write the full report as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

/// Parse `source=rate`
fn parse_rate_limit(s: &str) -> Result<(ResolutionSource, f64), String> {
    let (name, rate) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SOURCE=RATE, got '{}'", s))?;
    let source: ResolutionSource = serde_json::from_value(serde_json::Value::String(name.trim().to_lowercase()))
        .map_err(|_| format!("unknown source '{}'", name))?;
    let rate: f64 = rate
        .trim()
        .parse()
        .map_err(|_| format!("invalid rate '{}'", rate))?;
    Ok((source, rate))
}

fn parse_backoff(s: &str) -> Result<Backoff, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_lowercase()))
        .map_err(|_| format!("unknown backoff '{}' (expected constant, linear or exponential)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_limit() {
        assert_eq!(
            parse_rate_limit("doi_org=5").unwrap(),
            (ResolutionSource::DoiOrg, 5.0)
        );
        assert!(parse_rate_limit("doi_org").is_err());
        assert!(parse_rate_limit("nowhere=1").is_err());
        assert!(parse_rate_limit("crossref=fast").is_err());
    }

    #[test]
    fn test_resolve_retry_backoff_flag() {
        let cli = Cli::parse_from([
            "citation-resolution",
            "resolve",
            "--input",
            "c.json",
            "--retry-backoff",
            "Constant",
        ]);
        match cli.command {
            Commands::Resolve(args) => assert_eq!(args.retry_backoff, Some(Backoff::Constant)),
            _ => panic!("expected resolve"),
        }
        assert!(parse_backoff("quadratic").is_err());
    }

    #[test]
    fn test_evaluate_thresholds_split_on_comma() {
        let cli = Cli::parse_from([
            "citation-resolution",
            "evaluate",
            "--ground-truth",
            "gt.json",
            "--results",
            "r.json",
            "--thresholds",
            "0.3,0.9",
            "--match-criteria",
            "doi",
        ]);
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.thresholds, vec![0.3, 0.9]);
                assert_eq!(args.match_criteria, MatchCriteria::Doi);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
