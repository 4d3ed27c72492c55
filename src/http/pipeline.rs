//! Per-connection request pipeline.
//!
//! ```text
//! Receive ──▶ Parse ──▶ RateCheck ──▶ Stats? ──▶ CacheLookup ──▶ Fetch ──▶ Respond
//!    │          │           │            │            │            │          │
//!  abort       400         429       200 json     200 cached      404         │
//!    └──────────┴───────────┴────────────┴────────────┴────────────┴──────▶ Close
//! ```
//!
//! Every branch ends by closing the stream. Failures stay inside the
//! connection: they become a status code with an empty body, or a silent
//! close when the client socket itself failed.

use bytes::Bytes;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::cache::{Cache, CacheError};
use crate::config::ProxyConfig;
use crate::http::request::{parse_request_line, read_request_line, ParseError};
use crate::http::response::{Response, Status};
use crate::net::connection::ConnectionTask;
use crate::observability::metrics;
use crate::security::{RateLimitError, RateLimiter};
use crate::upstream::{FetchError, Fetcher};

/// Ways a single request can fail.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(#[from] ParseError),
    #[error("rate limit exceeded for client {0}")]
    RateLimited(String),
    #[error("origin unavailable: {0}")]
    OriginUnavailable(#[from] FetchError),
    #[error("client transport failure: {0}")]
    Transport(#[from] io::Error),
}

impl RequestError {
    /// Status sent to the client, or `None` when the connection is dropped silently.
    pub fn status(&self) -> Option<Status> {
        match self {
            RequestError::Malformed(_) => Some(Status::BadRequest),
            RequestError::RateLimited(_) => Some(Status::TooManyRequests),
            RequestError::OriginUnavailable(_) => Some(Status::NotFound),
            RequestError::Transport(_) => None,
        }
    }
}

/// Per-connection limits and the reserved stats path.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stats_path: String,
    pub fetch_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            stats_path: config.cache.stats_path.clone(),
            fetch_timeout: config.upstream.timeout(),
            read_timeout: config.timeouts.read(),
            write_timeout: config.timeouts.write(),
        }
    }
}

/// State shared by every connection task.
#[derive(Clone)]
pub struct ProxyState {
    pub cache: Arc<Cache>,
    pub limiter: Arc<RateLimiter>,
    pub fetcher: Arc<dyn Fetcher>,
    pub settings: PipelineSettings,
}

/// Error building [`ProxyState`] from configuration.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

impl ProxyState {
    pub fn from_config(config: &ProxyConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, StateError> {
        Ok(Self {
            cache: Arc::new(Cache::new(config.cache.capacity)?),
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)?),
            fetcher,
            settings: PipelineSettings::from_config(config),
        })
    }
}

/// Handle one accepted connection from first byte to close.
pub async fn serve_connection<S>(state: &ProxyState, task: ConnectionTask<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let client_id = task.client_id();
    let ConnectionTask { id, mut stream, peer } = task;
    let span = tracing::info_span!("connection", connection_id = %id, peer = %peer);

    async move {
        let start = Instant::now();

        let response = match process(state, &mut stream, &client_id).await {
            Ok(response) => Some(response),
            Err(RequestError::Transport(e)) => {
                tracing::debug!(error = %e, "Client transport failed, closing");
                None
            }
            Err(e) => {
                tracing::info!(error = %e, "Request rejected");
                e.status().map(Response::empty)
            }
        };

        if let Some(response) = response {
            let status = response.status;
            match write_response(&mut stream, &response, state.settings.write_timeout).await {
                Ok(()) => {
                    tracing::debug!(status = status.code(), bytes = response.body.len(), "Response sent");
                    metrics::record_request(status.code(), start);
                }
                Err(e) => tracing::debug!(error = %e, "Failed to send response"),
            }
        }

        close(&mut stream, state.settings.write_timeout).await;
    }
    .instrument(span)
    .await
}

/// Run the pipeline up to the point of having a response.
async fn process<S>(state: &ProxyState, stream: &mut S, client_id: &str) -> Result<Response, RequestError>
where
    S: AsyncRead + Unpin,
{
    let line = read_request_line(stream, state.settings.read_timeout).await?;
    if line.is_empty() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed before request").into());
    }

    let request = parse_request_line(&line)?;
    tracing::debug!(method = %request.method, url = %request.target, "Request received");

    if !state.limiter.allow(client_id) {
        return Err(RequestError::RateLimited(client_id.to_string()));
    }

    if request.target == state.settings.stats_path {
        let body = serde_json::to_vec(&state.cache.stats()).map_err(io::Error::from)?;
        return Ok(Response::ok(Bytes::from(body)));
    }

    if let Some(body) = state.cache.get(&request.target) {
        tracing::debug!(url = %request.target, "Cache hit");
        return Ok(Response::ok(body));
    }

    let fetch_start = Instant::now();
    let fetched = state.fetcher.fetch(&request.target, state.settings.fetch_timeout).await;
    match fetched {
        Ok(body) => {
            metrics::record_upstream_fetch("ok", fetch_start);
            state.cache.put(request.target, body.clone());
            Ok(Response::ok(body))
        }
        Err(e) => {
            metrics::record_upstream_fetch(e.kind(), fetch_start);
            tracing::warn!(url = %request.target, error = %e, "Origin fetch failed");
            Err(e.into())
        }
    }
}

async fn write_response<S>(stream: &mut S, response: &Response, timeout: Duration) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let bytes = response.encode();
    let write = async {
        stream.write_all(&bytes).await?;
        stream.flush().await
    };
    tokio::time::timeout(timeout, write)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out writing response"))?
}

async fn close<S>(stream: &mut S, timeout: Duration)
where
    S: AsyncWrite + Unpin,
{
    if let Ok(Err(e)) = tokio::time::timeout(timeout, stream.shutdown()).await {
        tracing::trace!(error = %e, "Error shutting down client stream");
    }
}
