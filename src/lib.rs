//! Caching forward proxy.
//!
//! Clients send `GET <absolute-url>` over plain TCP. The proxy answers from
//! a bounded LRU cache when it can, otherwise fetches the URL from the
//! origin, caches a successful body and relays it.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────────┐
//!                      │                    CACHING PROXY                      │
//!                      │                                                       │
//!   Client Request     │  ┌──────────┐   ┌───────────┐   ┌──────────────────┐  │
//!   ───────────────────┼─▶│   net    │──▶│    net    │──▶│  http::pipeline  │  │
//!                      │  │ listener │   │ admission │   │ parse/rate/stats │  │
//!                      │  └──────────┘   └───────────┘   └───────┬──────────┘  │
//!                      │                                         │             │
//!                      │                  ┌──────────┐   hit    ▼             │
//!   Client Response    │                  │  cache   │◀──────────┤             │
//!   ◀──────────────────┼──────────────────│   LRU    │    miss   ▼             │
//!                      │                  └──────────┘   ┌──────────────────┐  │
//!                      │                       ▲  put    │     upstream     │──┼──▶ Origin
//!                      │                       └─────────│     fetcher      │◀─┼───
//!                      │                                 └──────────────────┘  │
//!                      │  ┌─────────────────────────────────────────────────┐  │
//!                      │  │ config · security · observability · lifecycle   │  │
//!                      │  └─────────────────────────────────────────────────┘  │
//!                      └───────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod cache;
pub mod config;
pub mod http;
pub mod net;
pub mod upstream;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use cache::{Cache, CacheStats};
pub use config::schema::ProxyConfig;
pub use error::{ProxyError, Result};
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
pub use upstream::{Fetcher, HttpFetcher};
