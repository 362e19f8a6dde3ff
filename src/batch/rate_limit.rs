use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ConfigValidationError;
use crate::resolution::ResolutionSource;

use super::BatchConfig;

#[derive(Debug)]
struct Bucket {
    /// May go negative: each unit below zero is a caller already waiting
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket throttle for one external source.
///
/// Steady state is `rate` acquisitions per second; up to `burst` callers
/// pass without waiting after an idle period.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: f64) -> Result<Self, ConfigValidationError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigValidationError::new(
                "rate",
                format!("must be positive, got {}", rate),
            ));
        }
        if !(burst.is_finite() && burst > 0.0) {
            return Err(ConfigValidationError::new(
                "burst",
                format!("must be positive, got {}", burst),
            ));
        }

        Ok(Self {
            rate,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> f64 {
        self.burst
    }

    /// Take one token, sleeping for the shortfall when the bucket is empty.
    ///
    /// The token is reserved under the lock and the sleep happens after the
    /// lock is released, so waiters queue up in reservation order.
    pub async fn acquire(&self) {
        let wait = {
            let mut bucket = self.bucket.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
            bucket.last_refill = now;

            bucket.tokens -= 1.0;
            if bucket.tokens >= 0.0 {
                None
            } else {
                Some(Duration::from_secs_f64(-bucket.tokens / self.rate))
            }
        };

        if let Some(wait) = wait {
            debug!("Rate limiting: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// One [`RateLimiter`] per configured source
#[derive(Debug, Default)]
pub struct RateLimiterSet {
    limiters: HashMap<ResolutionSource, RateLimiter>,
}

impl RateLimiterSet {
    pub fn from_config(config: &BatchConfig) -> Result<Self, ConfigValidationError> {
        let mut limiters = HashMap::with_capacity(config.rate_limits().len());
        for (source, rate) in config.rate_limits() {
            limiters.insert(*source, RateLimiter::new(*rate, config.burst_for(*rate))?);
        }
        Ok(Self { limiters })
    }

    pub fn get(&self, source: ResolutionSource) -> Option<&RateLimiter> {
        self.limiters.get(&source)
    }

    /// Acquire every configured limiter among `sources`; unlimited sources pass through
    pub async fn acquire_all(&self, sources: &[ResolutionSource]) {
        for source in sources {
            if let Some(limiter) = self.limiters.get(source) {
                limiter.acquire().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_limits_rejected() {
        assert!(RateLimiter::new(0.0, 1.0).is_err());
        assert!(RateLimiter::new(-1.0, 1.0).is_err());
        assert!(RateLimiter::new(1.0, 0.0).is_err());
        assert!(RateLimiter::new(f64::INFINITY, 1.0).is_err());
        assert!(RateLimiter::new(2.0, 4.0).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_passes_without_delay() {
        let limiter = RateLimiter::new(10.0, 3.0).unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_state_rate_is_enforced() {
        let limiter = RateLimiter::new(10.0, 2.0).unwrap();
        let start = Instant::now();

        // 2 from the burst, then 8 more at 10/s
        for _ in 0..10 {
            limiter.acquire().await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(790), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(850), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_refills_while_idle() {
        let limiter = RateLimiter::new(5.0, 1.0).unwrap();
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let limiter = std::sync::Arc::new(RateLimiter::new(4.0, 1.0).unwrap());
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // First is free, the other three wait 0.25s each in turn
        assert!(start.elapsed() >= Duration::from_millis(740));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_set_skips_unconfigured_sources() {
        let mut opts = crate::batch::BatchOptions::default();
        opts.rate_limits = HashMap::from([(ResolutionSource::Crossref, 1.0)]);
        let config = BatchConfig::try_from(opts).unwrap();
        let set = RateLimiterSet::from_config(&config).unwrap();

        assert!(set.get(ResolutionSource::Crossref).is_some());
        assert!(set.get(ResolutionSource::Arxiv).is_none());

        let start = Instant::now();
        for _ in 0..5 {
            set.acquire_all(&[ResolutionSource::Arxiv]).await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
