//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, admission limits).
    pub listener: ListenerConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Origin fetch settings.
    pub upstream: UpstreamConfig,

    /// Client socket and shutdown timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum connections serviced concurrently (admission gate size).
    pub max_clients: usize,

    /// Worker threads in the runtime pool. Defaults to `max_clients`,
    /// capped at the available parallelism.
    pub workers: Option<usize>,
}

impl ListenerConfig {
    /// Effective worker pool size.
    ///
    /// An explicit `workers` is used as is. Otherwise one thread per client
    /// slot, up to the number of available cores; admission bounds
    /// concurrency, not the thread count.
    pub fn worker_threads(&self) -> usize {
        self.workers
            .unwrap_or_else(|| self.max_clients.min(available_cores()))
    }

    /// Replace the port of the bind address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.bind_address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.bind_address.clone(),
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_clients: 10,
            workers: None,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    pub capacity: usize,

    /// Reserved request target that returns cache counters as JSON.
    pub stats_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            stats_path: "/stats".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Bucket size; also the number of tokens refilled per window.
    pub max_tokens: u64,

    /// Refill window in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens: 5,
            window_ms: 60_000,
        }
    }
}

/// Origin fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Total time allowed for one origin fetch, in seconds.
    pub timeout_secs: u64,

    /// Follow HTTP redirects returned by the origin.
    pub follow_redirects: bool,

    /// Maximum redirects followed when `follow_redirects` is set.
    pub max_redirects: usize,

    /// User-Agent sent to origins.
    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            follow_redirects: true,
            max_redirects: 10,
            user_agent: concat!("caching-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Timeout configuration for client connections and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to receive the request head, in seconds.
    pub read_secs: u64,

    /// Time allowed to transmit a response, in seconds.
    pub write_secs: u64,

    /// Time allowed for in-flight connections to finish on shutdown.
    pub shutdown_secs: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 10,
            shutdown_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
