//! Response framing.
//!
//! Every response is a status line, a `Content-Length` header matching the
//! body exactly, a blank line, then the body:
//!
//! ```text
//! HTTP/1.1 <code> <reason>\r\nContent-Length: <n>\r\n\r\n<body>
//! ```
//!
//! Error responses carry an empty body; no error detail reaches the client.

use bytes::Bytes;
use std::fmt;

/// Status codes the proxy produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    TooManyRequests,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::TooManyRequests => 429,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::TooManyRequests => "Too Many Requests",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// A complete response ready to be written to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Bytes,
}

impl Response {
    pub fn ok(body: Bytes) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    /// A response with no body, used for errors.
    pub fn empty(status: Status) -> Self {
        Self {
            status,
            body: Bytes::new(),
        }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n",
            self.status,
            self.body.len()
        );
        let mut out = Vec::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_framing() {
        let response = Response::ok(Bytes::from_static(b"hello"));
        assert_eq!(
            response.encode(),
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello".to_vec()
        );
    }

    #[test]
    fn error_responses_are_empty() {
        for (status, line) in [
            (Status::BadRequest, "HTTP/1.1 400 Bad Request"),
            (Status::NotFound, "HTTP/1.1 404 Not Found"),
            (Status::TooManyRequests, "HTTP/1.1 429 Too Many Requests"),
        ] {
            let encoded = Response::empty(status).encode();
            assert_eq!(encoded, format!("{}\r\nContent-Length: 0\r\n\r\n", line).into_bytes());
        }
    }

    #[test]
    fn content_length_counts_bytes_not_chars() {
        let response = Response::ok(Bytes::from("héllo"));
        let encoded = String::from_utf8(response.encode()).unwrap();
        assert!(encoded.contains("Content-Length: 6\r\n"));
    }
}
