//! Accept loop for the caching proxy.
//!
//! # Responsibilities
//! - Accept client connections and wrap each in a [`ConnectionTask`]
//! - Hand tasks to the admission gate, blocking the loop while it is full
//! - Stop accepting on shutdown and drain in-flight connections
//!
//! Accepted sockets wait in the kernel-accepted state while the gate is
//! full; nothing is read from them until a slot frees up.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::http::pipeline::{serve_connection, ProxyState};
use crate::net::{Admission, ConnectionTask, Listener};
use crate::upstream::Fetcher;

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Caching forward proxy server.
pub struct ProxyServer {
    state: ProxyState,
    admission: Admission,
    shutdown_timeout: Duration,
}

impl ProxyServer {
    /// Build shared state and the admission gate from configuration.
    pub fn new(config: &ProxyConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        Ok(Self {
            state: ProxyState::from_config(config, fetcher)?,
            admission: Admission::new(config.listener.max_clients)?,
            shutdown_timeout: config.timeouts.shutdown(),
        })
    }

    /// Shared state, for inspection by embedders and tests.
    pub fn state(&self) -> &ProxyState {
        &self.state
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_clients = self.admission.max_clients(),
            "Proxy server accepting connections"
        );

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            let task = ConnectionTask::new(stream, peer);
            tracing::debug!(connection_id = %task.id, peer = %peer, "Connection accepted");

            let state = self.state.clone();
            let submit = self.admission.submit(async move {
                serve_connection(&state, task).await;
            });

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received while waiting for a free slot");
                    break;
                }
                submitted = submit => {
                    if let Err(e) = submitted {
                        tracing::error!(error = %e, "Admission gate closed");
                        break;
                    }
                }
            }
        }

        drop(listener);
        let in_flight = self.admission.in_flight();
        if in_flight > 0 {
            tracing::info!(in_flight, timeout_secs = self.shutdown_timeout.as_secs(), "Draining connections");
        }
        let drained = self.admission.drain(self.shutdown_timeout).await;
        tracing::info!(drained, "Proxy server stopped");
        Ok(())
    }
}
