//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request:
//!     → rate_limit.rs (per-client token bucket keyed by source IP)
//!     → denied: 429, connection closed
//!     → allowed: continue to cache lookup
//! ```
//!
//! # Design Decisions
//! - Buckets are created lazily and full, so a new client is never denied
//! - Fail closed: a denied request never reaches the cache or origin

pub mod rate_limit;

pub use rate_limit::{RateLimitError, RateLimiter};
