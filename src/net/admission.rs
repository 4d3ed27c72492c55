//! Admission control: a counting gate in front of the worker pool.
//!
//! `submit` waits for a free slot before spawning the connection task, so the
//! accept loop stalls (instead of dropping connections) once `max_clients`
//! tasks are in flight. The slot is an owned semaphore permit moved into the
//! task; it is returned on drop, which also runs when the task panics.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::observability::metrics;

/// Error type for admission control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("admission gate needs at least one slot")]
    ZeroSlots,
    #[error("admission gate supports at most {max} slots, got {requested}")]
    TooManySlots { requested: usize, max: usize },
    #[error("admission gate is closed")]
    Closed,
}

/// Bounds the number of connection tasks executing at once.
#[derive(Debug, Clone)]
pub struct Admission {
    gate: Arc<Semaphore>,
    max_clients: usize,
}

impl Admission {
    pub fn new(max_clients: usize) -> Result<Self, AdmissionError> {
        if max_clients == 0 {
            return Err(AdmissionError::ZeroSlots);
        }
        let max = (u32::MAX as usize).min(Semaphore::MAX_PERMITS);
        if max_clients > max {
            return Err(AdmissionError::TooManySlots {
                requested: max_clients,
                max,
            });
        }
        Ok(Self {
            gate: Arc::new(Semaphore::new(max_clients)),
            max_clients,
        })
    }

    /// Wait for a free slot, then run `task` on the worker pool.
    ///
    /// The slot is held until `task` finishes, whether it returns or panics.
    pub async fn submit<F>(&self, task: F) -> Result<JoinHandle<()>, AdmissionError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AdmissionError::Closed)?;

        let slot = Slot::new(permit);
        Ok(tokio::spawn(async move {
            let _slot = slot;
            task.await;
        }))
    }

    /// Slots currently held by running tasks.
    pub fn in_flight(&self) -> usize {
        self.max_clients - self.gate.available_permits()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Wait until every slot is free, up to `timeout`.
    ///
    /// Returns `true` if all in-flight tasks finished in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        // Bounded by `new`, so the cast is lossless.
        let all = self.max_clients as u32;
        match tokio::time::timeout(timeout, self.gate.acquire_many(all)).await {
            Ok(Ok(_permits)) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::warn!(
                    in_flight = self.in_flight(),
                    "Timed out waiting for connections to drain"
                );
                false
            }
        }
    }
}

/// A held admission slot.
#[derive(Debug)]
struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    fn new(permit: OwnedSemaphorePermit) -> Self {
        metrics::record_connection_opened();
        Self { _permit: permit }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        metrics::record_connection_closed();
    }
}
