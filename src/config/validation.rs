//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities, token counts, timeouts > 0)
//! - Check addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("listener.max_clients must be at least 1")]
    ZeroMaxClients,
    #[error("listener.workers must be at least 1")]
    ZeroWorkers,
    #[error("cache.capacity must be at least 1")]
    ZeroCacheCapacity,
    #[error("cache.stats_path `{0}` must start with '/'")]
    StatsPath(String),
    #[error("rate_limit.max_tokens must be at least 1")]
    ZeroMaxTokens,
    #[error("rate_limit.window_ms must be at least 1")]
    ZeroWindow,
    #[error("upstream.timeout_secs must be at least 1")]
    ZeroUpstreamTimeout,
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_clients == 0 {
        errors.push(ValidationError::ZeroMaxClients);
    }
    if config.listener.workers == Some(0) {
        errors.push(ValidationError::ZeroWorkers);
    }
    if config.cache.capacity == 0 {
        errors.push(ValidationError::ZeroCacheCapacity);
    }
    if !config.cache.stats_path.starts_with('/') {
        errors.push(ValidationError::StatsPath(config.cache.stats_path.clone()));
    }
    if config.rate_limit.max_tokens == 0 {
        errors.push(ValidationError::ZeroMaxTokens);
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
