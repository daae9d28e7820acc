// src/dag/job.rs

//! Graph node: static identity and edges plus per-run status and timing.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::types::{JobId, JobStatus};

/// Mutable run fields of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    pub status: JobStatus,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub exec_duration: Option<Duration>,
}

/// A single job in a [`Graph`](crate::dag::Graph).
///
/// Downstream edges are stored as ids into the owning graph's node table.
/// `upstream` is the declared number of incoming edges and sizes the job's
/// gate for every run.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    name: String,
    dependents: Vec<JobId>,
    upstream: usize,
    state: Mutex<JobState>,
}

impl Job {
    pub(crate) fn new(id: JobId, name: String, upstream: usize) -> Self {
        Self {
            id,
            name,
            dependents: Vec::new(),
            upstream,
            state: Mutex::new(JobState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ids of the jobs that depend on this one, in insertion order.
    pub fn dependents(&self) -> &[JobId] {
        &self.dependents
    }

    /// Declared upstream edge count (gate capacity).
    pub fn upstream_count(&self) -> usize {
        self.upstream
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    /// Copy of the job's current run fields.
    pub fn snapshot(&self) -> JobState {
        self.lock().clone()
    }

    pub(crate) fn push_dependents(&mut self, ids: impl IntoIterator<Item = JobId>) {
        self.dependents.extend(ids);
    }

    pub(crate) fn reset(&self) {
        *self.lock() = JobState::default();
    }

    pub(crate) fn mark_running(&self, at: Instant) {
        let mut state = self.lock();
        state.status = JobStatus::Running;
        state.started_at = Some(at);
        state.ended_at = None;
        state.exec_duration = None;
    }

    pub(crate) fn mark_finished(&self, status: JobStatus, at: Instant) {
        let mut state = self.lock();
        state.status = status;
        state.ended_at = Some(at);
        state.exec_duration = state.started_at.map(|s| at.saturating_duration_since(s));
    }

    pub(crate) fn mark_skipped(&self) {
        self.lock().status = JobStatus::Skipped;
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // Poisoning only means a panic elsewhere; the state itself stays valid.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
