//! Request head reading and request-line parsing.
//!
//! # Responsibilities
//! - Read the request line from the client, bounded in size and time
//! - Extract method and target from the request line
//! - Reject anything other than `GET <target>`
//!
//! # Design Decisions
//! - Only the request line matters; headers and body are never waited for
//! - The version token is not validated

use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest request head the proxy buffers.
pub const MAX_HEAD_BYTES: usize = 8 * 1024;

/// Parsed first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
}

/// Why a request line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("request line is empty")]
    Empty,
    #[error("unsupported method `{0}`")]
    Method(String),
    #[error("request line has no target")]
    MissingTarget,
}

/// Parse `GET <target> [version]` from the start of a request head.
pub fn parse_request_line(head: &[u8]) -> Result<RequestLine, ParseError> {
    let text = String::from_utf8_lossy(head);
    let line = text.lines().next().unwrap_or_default();
    let mut tokens = line.split_whitespace();

    let method = tokens.next().ok_or(ParseError::Empty)?;
    if method != "GET" {
        return Err(ParseError::Method(method.to_string()));
    }
    let target = tokens.next().ok_or(ParseError::MissingTarget)?;

    Ok(RequestLine {
        method: method.to_string(),
        target: target.to_string(),
    })
}

/// Read until the request line is complete, EOF, or [`MAX_HEAD_BYTES`].
///
/// Returns as soon as the first `\n` arrives; headers the client may still
/// be sending are not waited for. An empty result means the client closed
/// without sending anything. A timeout before the line completes is an error.
pub async fn read_request_line<R>(stream: &mut R, timeout: Duration) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut head = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                head.extend_from_slice(&chunk[..n]);
                if head.contains(&b'\n') || head.len() >= MAX_HEAD_BYTES {
                    break;
                }
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "timed out waiting for request line",
                ))
            }
        }
    }

    Ok(head)
}
