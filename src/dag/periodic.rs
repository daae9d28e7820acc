// src/dag/periodic.rs

//! Cadence gating for jobs that should only run every N scheduling cycles.

use std::collections::HashMap;

use tracing::trace;

use crate::types::JobId;

/// Per-job tick counters.
///
/// Owned by a [`Scheduler`](crate::dag::Scheduler) instance, so two schedulers
/// driving the same graph never share cadence state.
#[derive(Debug, Default, Clone)]
pub struct PeriodicGate {
    ticks: HashMap<JobId, u32>,
}

impl PeriodicGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for `id` and report whether this cycle qualifies.
    ///
    /// The counter increments on every call; once it reaches `every` it
    /// resets to zero and the call returns `true`. A job with `every = 3`
    /// therefore proceeds on cycles 3, 6, 9, ... and `every <= 1` proceeds on
    /// every cycle.
    pub fn time_to_run(&mut self, id: &str, every: u32) -> bool {
        let tick = self.ticks.entry(id.to_string()).or_insert(0);
        *tick += 1;
        if *tick >= every {
            *tick = 0;
            trace!(job = %id, every, "cadence reached");
            true
        } else {
            trace!(job = %id, every, tick = *tick, "cadence not reached");
            false
        }
    }

    /// Current counter value for `id`.
    pub fn ticks_of(&self, id: &str) -> u32 {
        self.ticks.get(id).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.ticks.clear();
    }
}
