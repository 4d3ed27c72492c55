//! Origin fetching.
//!
//! # Data Flow
//! ```text
//! cache miss in the pipeline
//!     → Fetcher::fetch(target, timeout)
//!     → Ok(body): stored in the cache and returned as 200
//!     → Err(_): 404 to the client, nothing cached
//! ```
//!
//! # Design Decisions
//! - `Fetcher` is object safe so the pipeline holds `Arc<dyn Fetcher>` and
//!   tests can substitute an in-memory origin
//! - Timeout expiry is an ordinary failure; callers do not distinguish
//!   "origin down" from "origin slow"

pub mod fetch;

pub use fetch::{FetchError, Fetcher, HttpFetcher};
