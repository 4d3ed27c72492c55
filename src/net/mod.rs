//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, yields stream + peer address)
//!     → connection.rs (ConnectionTask: ID, stream, peer)
//!     → admission.rs (wait for a slot, spawn on the worker pool)
//!     → Hand off to the HTTP request pipeline
//! ```
//!
//! # Design Decisions
//! - Excess connections queue behind the admission gate; none are dropped
//! - A slot is released by drop, so every exit path returns it

pub mod admission;
pub mod connection;
pub mod listener;

pub use admission::{Admission, AdmissionError};
pub use connection::{ConnectionId, ConnectionTask};
pub use listener::{Listener, ListenerError};
