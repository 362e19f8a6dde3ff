//! Chunked, rate-limited, checkpointable citation resolution.
//!
//! [`BatchCitationProcessor`] drives an injected [`Resolver`](crate::resolution::Resolver)
//! over a list of citations:
//!
//! ```text
//! checkpoint ──► skip already-resolved ──► chunks of chunk_size
//!                                              │
//!                      ┌───────────────────────┘
//!                      ▼
//!        semaphore(max_concurrent) ─► cache ─► rate limiter ─► timeout/retry ─► resolver
//!                      │
//!                      ▼
//!        merge in input order ─► statistics ─► checkpoint every N
//! ```

pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod processor;
pub mod rate_limit;
pub mod stats;

pub use cache::*;
pub use checkpoint::*;
pub use config::*;
pub use processor::*;
pub use rate_limit::*;
pub use stats::*;
