//! HTTP/1.x handling over raw TCP.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept, admission)
//!     → pipeline.rs (rate check, stats path, cache, origin fetch)
//!         → request.rs (read head, parse request line)
//!         → response.rs (status line + Content-Length framing)
//!     → close
//! ```

pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::{serve_connection, PipelineSettings, ProxyState, RequestError, StateError};
pub use request::{parse_request_line, RequestLine, ParseError};
pub use response::{Response, Status};
pub use server::ProxyServer;
