//! Top-level error type for starting and running the proxy.
//!
//! Per-request failures never reach this type; they are turned into a
//! status code inside the connection pipeline.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::http::StateError;
use crate::net::{AdmissionError, ListenerError};
use crate::security::RateLimitError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("rate limiter error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("admission error: {0}")]
    Admission(#[from] AdmissionError),

    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("failed to build origin client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StateError> for ProxyError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Cache(e) => ProxyError::Cache(e),
            StateError::RateLimit(e) => ProxyError::RateLimit(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
