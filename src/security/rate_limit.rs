//! Per-client token bucket rate limiting.
//!
//! Each client starts with a full bucket of `max_tokens`. Tokens refill in
//! proportion to elapsed time at `max_tokens / window` per millisecond, in
//! whole tokens only: a refill that would add less than one token is skipped
//! and the elapsed time keeps accumulating until it adds at least one.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Error constructing a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("rate limiter max_tokens must be at least 1")]
    ZeroTokens,
    #[error("rate limiter window must be at least 1ms")]
    ZeroWindow,
}

/// A single client's allowance.
#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: u64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: u64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn try_acquire(&mut self, capacity: u64, window_ms: u64, now: Instant) -> bool {
        let elapsed_ms = now.saturating_duration_since(self.last_refill).as_millis();
        let to_add = elapsed_ms * u128::from(capacity) / u128::from(window_ms);

        // Fractional tokens are dropped, not carried to the next call.
        if to_add >= 1 {
            let refilled = u128::from(self.tokens) + to_add;
            self.tokens = refilled.min(u128::from(capacity)) as u64;
            self.last_refill = now;
        }

        if self.tokens >= 1 {
            self.tokens -= 1;
            self.last_refill = now;
            true
        } else {
            false
        }
    }
}

/// Token bucket limiter keyed by client identifier (e.g. source IP).
///
/// The client table is sharded; each bucket's read-modify-write happens under
/// its shard lock, so buckets of different clients update in parallel.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    max_tokens: u64,
    window_ms: u64,
}

impl RateLimiter {
    pub fn new(max_tokens: u64, window: Duration) -> Result<Self, RateLimitError> {
        if max_tokens == 0 {
            return Err(RateLimitError::ZeroTokens);
        }
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        if window_ms == 0 {
            return Err(RateLimitError::ZeroWindow);
        }
        Ok(Self {
            buckets: DashMap::new(),
            max_tokens,
            window_ms,
        })
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        Self::new(config.max_tokens, Duration::from_millis(config.window_ms))
    }

    /// Decide whether `client_id` may make a request now, consuming a token if so.
    pub fn allow(&self, client_id: &str) -> bool {
        let allowed = self.allow_at(client_id, Instant::now());
        if !allowed {
            tracing::warn!(client = %client_id, "Rate limit exceeded");
            metrics::record_rate_limited();
        }
        allowed
    }

    /// Same as [`allow`](Self::allow) against an explicit clock reading.
    ///
    /// Readings for one client must not go backwards; an earlier reading is
    /// treated as zero elapsed time.
    pub fn allow_at(&self, client_id: &str, now: Instant) -> bool {
        if let Some(mut bucket) = self.buckets.get_mut(client_id) {
            return bucket.try_acquire(self.max_tokens, self.window_ms, now);
        }

        self.buckets
            .entry(client_id.to_owned())
            .or_insert_with(|| TokenBucket::full(self.max_tokens, now))
            .try_acquire(self.max_tokens, self.window_ms, now)
    }

    /// Tokens currently held by a client, if it has been seen.
    #[cfg(test)]
    pub(crate) fn tokens(&self, client_id: &str) -> Option<u64> {
        self.buckets.get(client_id).map(|bucket| bucket.tokens)
    }

    /// Number of clients with a bucket.
    #[cfg(test)]
    pub(crate) fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}
