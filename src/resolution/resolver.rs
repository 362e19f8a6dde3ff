use anyhow::Result;
use async_trait::async_trait;

use super::{Citation, ResolutionResult, ResolutionSource};

/// A strategy that maps one citation to a canonical record.
///
/// The batch processor owns retry, timeout, caching and rate limiting, so
/// implementations make a single attempt. Returning `Err` marks the attempt
/// as failed and makes it eligible for retry; "nothing matched" should be an
/// `Ok` result with status `Unresolved`.
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use citation_resolution::resolution::{Citation, ResolutionResult, Resolver};
///
/// struct NeverFinds;
///
/// #[async_trait]
/// impl Resolver for NeverFinds {
///     async fn resolve(&self, citation: &Citation) -> Result<ResolutionResult> {
///         Ok(ResolutionResult::unresolved(citation.clone(), vec![]))
///     }
/// }
/// ```
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a single citation
    async fn resolve(&self, citation: &Citation) -> Result<ResolutionResult>;

    /// External services contacted by [`Resolver::resolve`].
    ///
    /// The processor acquires the rate limiter of each listed source before
    /// every attempt.
    fn sources(&self) -> Vec<ResolutionSource> {
        Vec::new()
    }

    /// Name used in logs
    fn name(&self) -> &str {
        "resolver"
    }
}
