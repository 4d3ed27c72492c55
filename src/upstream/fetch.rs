//! Outbound GET against the origin named by the request target.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::{redirect, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;

/// Why an origin fetch produced no cacheable body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid origin URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported origin scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("origin request timed out")]
    Timeout,
    #[error("origin request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("origin responded with status {0}")]
    Status(u16),
    #[error("origin returned an empty body")]
    EmptyBody,
}

impl FetchError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl { .. } | FetchError::UnsupportedScheme(_) => "invalid_url",
            FetchError::Timeout => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Status(_) => "status",
            FetchError::EmptyBody => "empty_body",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e)
        }
    }
}

/// Retrieves origin content for a request target.
pub trait Fetcher: Send + Sync {
    /// GET `url`, failing if no complete body arrives within `timeout`.
    fn fetch<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Bytes, FetchError>>;
}

/// `reqwest`-backed origin client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let policy = if config.follow_redirects {
            redirect::Policy::limited(config.max_redirects)
        } else {
            redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .redirect(policy)
            .user_agent(config.user_agent.as_str())
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }

    async fn get(&self, target: &str, timeout: Duration) -> Result<Bytes, FetchError> {
        let url = origin_url(target)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body)
    }
}

/// Parse a request target, assuming `http://` when it names no scheme.
///
/// `host:port/path` parses as a URL with scheme `host`, so any target without
/// `://` that did not yield a host is retried with the prefix. Origin-form
/// targets (`/path`) stay invalid.
fn origin_url(target: &str) -> Result<Url, FetchError> {
    let with_default_scheme = || Url::parse(&format!("http://{}", target));
    let parsed = match Url::parse(target) {
        Ok(url) if url.has_host() => Ok(url),
        Ok(_) if !target.contains("://") => with_default_scheme(),
        Err(url::ParseError::RelativeUrlWithoutBase) if !target.starts_with('/') => {
            with_default_scheme()
        }
        other => other,
    };

    parsed.map_err(|source| FetchError::InvalidUrl {
        url: target.to_string(),
        source,
    })
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(self.get(url, timeout))
    }
}
