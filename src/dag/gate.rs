// src/dag/gate.rs

//! Counting rendezvous used for upstream gates and the completion barrier.
//!
//! A [`Rendezvous`] of capacity `N` opens once exactly `N` signals have been
//! received. Signals are semaphore permits: every `signal()` adds one permit
//! and `wait()` acquires (and forgets) `N` of them in a single request, so
//! concurrent senders can never be under- or over-counted.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Result of waiting on a [`Rendezvous`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// All expected signals arrived.
    Opened,
    /// The run was cancelled before the rendezvous completed.
    Cancelled,
}

/// Fixed-capacity counting rendezvous.
#[derive(Debug, Clone)]
pub struct Rendezvous {
    capacity: usize,
    signals: Arc<Semaphore>,
}

/// Per-job gate, sized to the job's upstream edge count.
pub type UpstreamGate = Rendezvous;

/// Per-run barrier, sized to the number of jobs reachable from root.
pub type CompletionBarrier = Rendezvous;

impl Rendezvous {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            signals: Arc::new(Semaphore::new(0)),
        }
    }

    /// Number of signals this rendezvous waits for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Signals received but not yet consumed by `wait`.
    pub fn pending_signals(&self) -> usize {
        self.signals.available_permits()
    }

    /// Deliver one signal.
    pub fn signal(&self) {
        self.signals.add_permits(1);
    }

    /// Block until exactly `capacity` signals have been received, or until
    /// `cancel` fires. Capacity 0 opens immediately.
    pub async fn wait(&self, cancel: &CancellationToken) -> GateOutcome {
        if self.capacity == 0 {
            return GateOutcome::Opened;
        }

        let wanted = u32::try_from(self.capacity).unwrap_or(u32::MAX);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => GateOutcome::Cancelled,
            acquired = self.signals.acquire_many(wanted) => match acquired {
                Ok(permit) => {
                    permit.forget();
                    GateOutcome::Opened
                }
                // The semaphore is never closed; treat it like cancellation.
                Err(_) => GateOutcome::Cancelled,
            },
        }
    }
}
