use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigValidationError;
use crate::resolution::ResolutionSource;

/// Upper bound on a single retry sleep
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Raw, unvalidated batch settings as read from CLI flags or a JSON file.
///
/// Turn into a [`BatchConfig`] with `BatchConfig::try_from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub chunk_size: usize,
    pub max_concurrent: usize,
    pub checkpoint_interval: i64,
    pub checkpoint_path: Option<PathBuf>,
    pub enable_caching: bool,
    pub timeout_seconds: f64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: f64,
    pub retry_backoff: Backoff,
    /// Requests per second allowed against each source
    pub rate_limits: HashMap<ResolutionSource, f64>,
    /// Bucket capacity shared by every limiter; defaults to `ceil(rate)`
    pub rate_limit_burst: Option<f64>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        let rate_limits = HashMap::from([
            (ResolutionSource::Crossref, 10.0),
            (ResolutionSource::Unpaywall, 10.0),
            (ResolutionSource::Openalex, 10.0),
            (ResolutionSource::SemanticScholar, 1.0),
            (ResolutionSource::Arxiv, 0.33),
            (ResolutionSource::DoiOrg, 10.0),
        ]);

        Self {
            chunk_size: 100,
            max_concurrent: 10,
            checkpoint_interval: 100,
            checkpoint_path: None,
            enable_caching: true,
            timeout_seconds: 30.0,
            retry_attempts: 3,
            retry_delay_seconds: 1.0,
            retry_backoff: Backoff::Exponential,
            rate_limits,
            rate_limit_burst: None,
        }
    }
}

/// Validated, immutable configuration of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BatchOptions")]
pub struct BatchConfig {
    chunk_size: usize,
    max_concurrent: usize,
    checkpoint_interval: usize,
    checkpoint_path: Option<PathBuf>,
    enable_caching: bool,
    timeout_seconds: f64,
    retry_attempts: u32,
    retry_delay_seconds: f64,
    retry_backoff: Backoff,
    rate_limits: HashMap<ResolutionSource, f64>,
    rate_limit_burst: Option<f64>,
}

impl TryFrom<BatchOptions> for BatchConfig {
    type Error = ConfigValidationError;

    fn try_from(opts: BatchOptions) -> Result<Self, Self::Error> {
        if opts.chunk_size < 1 {
            return Err(ConfigValidationError::new("chunk_size", "must be at least 1"));
        }
        if opts.max_concurrent < 1 {
            return Err(ConfigValidationError::new("max_concurrent", "must be at least 1"));
        }
        if opts.checkpoint_interval < 0 {
            return Err(ConfigValidationError::new(
                "checkpoint_interval",
                format!("must be non-negative, got {}", opts.checkpoint_interval),
            ));
        }
        if !(opts.timeout_seconds.is_finite() && opts.timeout_seconds > 0.0) {
            return Err(ConfigValidationError::new(
                "timeout_seconds",
                format!("must be positive, got {}", opts.timeout_seconds),
            ));
        }
        if !(opts.retry_delay_seconds.is_finite() && opts.retry_delay_seconds >= 0.0) {
            return Err(ConfigValidationError::new(
                "retry_delay_seconds",
                format!("must be non-negative, got {}", opts.retry_delay_seconds),
            ));
        }
        for (source, rate) in &opts.rate_limits {
            if !(rate.is_finite() && *rate > 0.0) {
                return Err(ConfigValidationError::new(
                    "rate_limits",
                    format!("rate for {} must be positive, got {}", source, rate),
                ));
            }
        }
        if let Some(burst) = opts.rate_limit_burst {
            if !(burst.is_finite() && burst > 0.0) {
                return Err(ConfigValidationError::new(
                    "rate_limit_burst",
                    format!("must be positive, got {}", burst),
                ));
            }
        }

        Ok(Self {
            chunk_size: opts.chunk_size,
            max_concurrent: opts.max_concurrent,
            checkpoint_interval: opts.checkpoint_interval as usize,
            checkpoint_path: opts.checkpoint_path,
            enable_caching: opts.enable_caching,
            timeout_seconds: opts.timeout_seconds,
            retry_attempts: opts.retry_attempts,
            retry_delay_seconds: opts.retry_delay_seconds,
            retry_backoff: opts.retry_backoff,
            rate_limits: opts.rate_limits,
            rate_limit_burst: opts.rate_limit_burst,
        })
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::try_from(BatchOptions::default()).expect("default batch options are valid")
    }
}

impl BatchConfig {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Processed-citation interval between checkpoint writes (0 = only at the end)
    pub fn checkpoint_interval(&self) -> usize {
        self.checkpoint_interval
    }

    pub fn checkpoint_path(&self) -> Option<&Path> {
        self.checkpoint_path.as_deref()
    }

    pub fn enable_caching(&self) -> bool {
        self.enable_caching
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    pub fn timeout_seconds(&self) -> f64 {
        self.timeout_seconds
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn rate_limits(&self) -> &HashMap<ResolutionSource, f64> {
        &self.rate_limits
    }

    /// Bucket capacity for a source limited to `rate` requests per second
    pub fn burst_for(&self, rate: f64) -> f64 {
        self.rate_limit_burst.unwrap_or_else(|| rate.ceil().max(1.0))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_attempts,
            base_delay: Duration::from_secs_f64(self.retry_delay_seconds),
            backoff: self.retry_backoff,
        }
    }
}

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Constant,
    Linear,
    #[default]
    Exponential,
}

/// Retry schedule applied uniformly to every resolver call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let factor = match self.backoff {
            Backoff::Constant => 1.0,
            Backoff::Linear => retry as f64,
            Backoff::Exponential => 2f64.powi(retry.saturating_sub(1).min(30) as i32),
        };
        let delay = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(MAX_RETRY_DELAY.as_secs_f64()))
    }
}
