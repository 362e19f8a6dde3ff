use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};

use crate::common::format_elapsed;
use crate::error::{ConfigValidationError, ResolutionError};
use crate::resolution::{Citation, ResolutionMetadata, ResolutionResult, ResolutionStatus, Resolver};

use super::{
    cache_key, load_checkpoint, save_checkpoint, BatchConfig, BatchStatistics, RateLimiterSet,
    ResolutionCache, RetryPolicy,
};

/// Multiplier for buffer_unordered capacity relative to concurrency
const BUFFER_CAPACITY_MULTIPLIER: usize = 2;

/// Error message given to citations skipped by cancellation
pub const CANCELLED_MESSAGE: &str = "batch cancelled";

/// Error kind given to citations skipped by cancellation
pub const CANCELLED_KIND: &str = "cancelled";

/// Cooperative stop flag, checked between chunks
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one citation inside a chunk
#[derive(Debug)]
struct CitationOutcome {
    index: usize,
    result: ResolutionResult,
    cache_hit: bool,
    retries: u32,
}

/// Resolves citations in chunks with bounded concurrency, per-source rate
/// limits, retries, caching and resumable checkpoints.
pub struct BatchCitationProcessor {
    resolver: Arc<dyn Resolver>,
    config: BatchConfig,
    retry_policy: RetryPolicy,
    limiters: RateLimiterSet,
    semaphore: Semaphore,
    cache: Mutex<ResolutionCache>,
    statistics: BatchStatistics,
    cancellation: CancellationToken,
    progress: Option<ProgressBar>,
}

impl BatchCitationProcessor {
    pub fn new(resolver: Arc<dyn Resolver>, config: BatchConfig) -> Result<Self, ConfigValidationError> {
        let limiters = RateLimiterSet::from_config(&config)?;
        Ok(Self {
            resolver,
            retry_policy: config.retry_policy(),
            semaphore: Semaphore::new(config.max_concurrent()),
            config,
            limiters,
            cache: Mutex::new(ResolutionCache::new()),
            statistics: BatchStatistics::default(),
            cancellation: CancellationToken::new(),
            progress: None,
        })
    }

    /// Use an externally created cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Advance `progress` by the number of citations in each finished chunk
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Token that stops the current batch at the next chunk boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Statistics of the most recent `process_batch` call
    pub fn statistics(&self) -> &BatchStatistics {
        &self.statistics
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    /// Resolve every citation, returning one result per citation in input order.
    ///
    /// Per-citation failures become `Failed` results; this never errors.
    /// Checkpoint results for citations outside this batch are kept in the
    /// checkpoint file so a later batch can still resume from them.
    pub async fn process_batch(&mut self, citations: &[Citation]) -> Vec<ResolutionResult> {
        let start = Instant::now();
        self.statistics = BatchStatistics::new(citations.len());

        let mut slots: Vec<Option<ResolutionResult>> = vec![None; citations.len()];

        // Phase 1: resume from checkpoint
        let mut resumed = self.load_resume_state().await;
        let mut pending: Vec<usize> = Vec::with_capacity(citations.len());
        for (index, citation) in citations.iter().enumerate() {
            match resumed.get(&cache_key(citation)) {
                Some(result) => {
                    self.statistics.record_resumed();
                    self.statistics.update_from_result(result);
                    slots[index] = Some(result.clone());
                }
                None => pending.push(index),
            }
        }
        let batch_keys: HashSet<String> = citations.iter().map(cache_key).collect();
        resumed.retain(|key, _| !batch_keys.contains(key));
        let carried: Vec<ResolutionResult> = resumed.into_values().collect();

        if self.statistics.resumed_from_checkpoint > 0 {
            info!(
                "Resuming: {} of {} citations already in checkpoint",
                self.statistics.resumed_from_checkpoint,
                citations.len()
            );
        }
        if let Some(pb) = &self.progress {
            pb.inc(self.statistics.resumed_from_checkpoint as u64);
        }

        // Phase 2: resolve remaining citations chunk by chunk
        let chunk_size = self.config.chunk_size();
        let num_chunks = pending.len().div_ceil(chunk_size);
        info!(
            "Processing {} citations in {} chunks (chunk_size={}, max_concurrent={})",
            pending.len(),
            num_chunks,
            chunk_size,
            self.config.max_concurrent()
        );

        let mut completed = self.statistics.resumed_from_checkpoint;
        let mut unsaved = false;
        for (chunk_idx, chunk) in pending.chunks(chunk_size).enumerate() {
            if self.cancellation.is_cancelled() {
                warn!(
                    "Batch cancelled after {} of {} chunks",
                    chunk_idx, num_chunks
                );
                break;
            }

            let outcomes = self.run_chunk(citations, chunk).await;
            for outcome in outcomes {
                if outcome.cache_hit {
                    self.statistics.record_cache_hit();
                }
                self.statistics.record_retries(outcome.retries as usize);
                self.statistics.update_from_result(&outcome.result);
                slots[outcome.index] = Some(outcome.result);
            }

            let before = completed;
            completed += chunk.len();
            unsaved = true;
            if let Some(pb) = &self.progress {
                pb.inc(chunk.len() as u64);
            }
            debug!(
                "Chunk {}/{} done ({} citations complete)",
                chunk_idx + 1,
                num_chunks,
                completed
            );

            let interval = self.config.checkpoint_interval();
            let crossed = interval > 0 && completed / interval > before / interval;
            if crossed || chunk_idx + 1 == num_chunks {
                self.write_checkpoint(&slots, &carried);
                unsaved = false;
            }
        }

        if unsaved {
            self.write_checkpoint(&slots, &carried);
        }

        // Citations never reached (cancellation) still get a result
        let results: Vec<ResolutionResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(result) => result,
                None => {
                    let result = ResolutionResult::failed_with_kind(
                        citations[index].clone(),
                        CANCELLED_KIND,
                        CANCELLED_MESSAGE,
                    );
                    self.statistics.update_from_result(&result);
                    result
                }
            })
            .collect();

        self.statistics.finalize();
        if let Some(pb) = &self.progress {
            pb.finish_with_message("Resolution complete");
        }

        info!(
            "Batch complete in {}: {} resolved, {} unresolved/failed, {} cache hits, {} checkpoints",
            format_elapsed(start.elapsed()),
            self.statistics.successful_resolutions,
            self.statistics.failed_resolutions,
            self.statistics.cache_hits,
            self.statistics.checkpoints_saved
        );

        results
    }

    /// Resolve one citation through the cache and retry path, outside any batch
    pub async fn resolve_one(&self, citation: &Citation) -> ResolutionResult {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore should never be closed");
        self.process_citation(0, citation).await.result
    }

    /// Results from the checkpoint file that may be reused, keyed by cache key.
    /// Also seeds the cache with them.
    async fn load_resume_state(&self) -> HashMap<String, ResolutionResult> {
        let Some(path) = self.config.checkpoint_path() else {
            return HashMap::new();
        };

        let results = match load_checkpoint(path) {
            Ok(Some(results)) => results,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                warn!("Ignoring unusable checkpoint: {}", e);
                return HashMap::new();
            }
        };

        let mut resumable = HashMap::with_capacity(results.len());
        let mut cache = self.cache.lock().await;
        for result in results {
            if result.status == ResolutionStatus::Failed {
                continue;
            }
            let key = cache_key(&result.citation);
            if self.config.enable_caching() {
                cache.insert(key.clone(), result.clone());
            }
            resumable.insert(key, result);
        }
        info!("Loaded {} reusable results from checkpoint {:?}", resumable.len(), path);
        resumable
    }

    /// Resolve one chunk. Repeats of a cache key wait for the first copy and
    /// are then served from the cache.
    async fn run_chunk(&self, citations: &[Citation], indices: &[usize]) -> Vec<CitationOutcome> {
        if !self.config.enable_caching() {
            return self.resolve_concurrently(citations, indices).await;
        }

        let mut seen = HashSet::with_capacity(indices.len());
        let (first, repeats): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&index| seen.insert(cache_key(&citations[index])));

        let mut outcomes = self.resolve_concurrently(citations, &first).await;
        if !repeats.is_empty() {
            debug!("{} repeated citations in chunk", repeats.len());
            outcomes.extend(self.resolve_concurrently(citations, &repeats).await);
        }
        outcomes
    }

    async fn resolve_concurrently(&self, citations: &[Citation], indices: &[usize]) -> Vec<CitationOutcome> {
        let concurrency = self.config.max_concurrent();

        stream::iter(indices.iter().copied())
            .map(|index| async move {
                let _permit = self
                    .semaphore
                    .acquire()
                    .await
                    .expect("semaphore should never be closed");
                self.process_citation(index, &citations[index]).await
            })
            .buffer_unordered(concurrency * BUFFER_CAPACITY_MULTIPLIER)
            .collect()
            .await
    }

    async fn process_citation(&self, index: usize, citation: &Citation) -> CitationOutcome {
        let key = cache_key(citation);

        if self.config.enable_caching() {
            let cached = self.cache.lock().await.get(&key).cloned();
            if let Some(result) = cached {
                debug!("Cache hit for '{}'", citation.title);
                let metadata = ResolutionMetadata {
                    attempts: 0,
                    ..result.metadata.clone()
                };
                return CitationOutcome {
                    index,
                    result: result.with_metadata(metadata),
                    cache_hit: true,
                    retries: 0,
                };
            }
        }

        let (result, retries) = self.resolve_with_retry(citation).await;

        if self.config.enable_caching() {
            self.cache.lock().await.insert(key, result.clone());
        }

        CitationOutcome {
            index,
            result,
            cache_hit: false,
            retries,
        }
    }

    /// Call the resolver under the timeout, retrying per the retry policy.
    ///
    /// Returns the result and the number of retries used.
    async fn resolve_with_retry(&self, citation: &Citation) -> (ResolutionResult, u32) {
        let started = Instant::now();
        let sources = self.resolver.sources();
        let max_attempts = self.retry_policy.max_attempts();
        let mut last_error: Option<ResolutionError> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.retry_policy.delay_for(attempt - 1);
                debug!(
                    "Retrying '{}' in {:?} (attempt {}/{})",
                    citation.title, delay, attempt, max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            self.limiters.acquire_all(&sources).await;

            match self.attempt(citation).await {
                Ok(result) => {
                    let metadata = ResolutionMetadata {
                        attempts: attempt,
                        resolution_time_ms: started.elapsed().as_millis() as u64,
                        ..result.metadata.clone()
                    };
                    return (result.with_metadata(metadata), attempt - 1);
                }
                Err(e) => {
                    debug!("{} attempt {} for '{}': {}", self.resolver.name(), attempt, citation.title, e);
                    last_error = Some(e);
                }
            }
        }

        let (kind, message) = match &last_error {
            Some(e) => (e.kind(), format!("{} (after {} attempts)", e, max_attempts)),
            None => ("failure", format!("no resolution attempts made ({} configured)", max_attempts)),
        };
        warn!("Giving up on '{}': {}", citation.title, message);

        let failed = ResolutionResult::failed_with_kind(citation.clone(), kind, message);
        let metadata = ResolutionMetadata {
            api_sources_tried: sources,
            attempts: max_attempts,
            resolution_time_ms: started.elapsed().as_millis() as u64,
            ..failed.metadata.clone()
        };
        (failed.with_metadata(metadata), max_attempts.saturating_sub(1))
    }

    async fn attempt(&self, citation: &Citation) -> Result<ResolutionResult, ResolutionError> {
        match tokio::time::timeout(self.config.timeout(), self.resolver.resolve(citation)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(ResolutionError::Failure(format!("{:#}", e))),
            Err(_) => Err(ResolutionError::Timeout {
                seconds: self.config.timeout_seconds(),
            }),
        }
    }

    /// Write completed slots plus results `carried` over from an earlier checkpoint
    fn write_checkpoint(&mut self, slots: &[Option<ResolutionResult>], carried: &[ResolutionResult]) {
        let Some(path) = self.config.checkpoint_path() else {
            return;
        };

        let completed: Vec<ResolutionResult> = slots.iter().flatten().chain(carried).cloned().collect();

        // The snapshot counts itself
        self.statistics.record_checkpoint();
        match save_checkpoint(path, &completed, &self.statistics) {
            Ok(()) => info!("Checkpoint saved: {} results -> {:?}", completed.len(), path),
            Err(e) => {
                self.statistics.checkpoints_saved -= 1;
                warn!("Failed to save checkpoint: {:#}", e);
            }
        }
    }
}
