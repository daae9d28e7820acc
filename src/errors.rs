// src/errors.rs

//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

use crate::dag::{CallRecord, JobId};

#[derive(Error, Debug)]
pub enum DepjobsError {
    #[error("Graph load error: {0}")]
    GraphLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Duplicate job id: {0}")]
    DuplicateJobId(JobId),

    #[error("Unknown job reference: {0}")]
    UnknownJobReference(JobId),

    #[error("Graph has no root job '{0}'")]
    MissingRoot(JobId),

    #[error("Cycle detected in job graph: {0}")]
    CycleDetected(String),

    #[error("Jobs unreachable from root: {}", .0.join(", "))]
    UnreachableNode(Vec<JobId>),

    #[error("Job '{id}' declares {declared} upstream jobs but has {actual} incoming edges")]
    UpstreamMismatch {
        id: JobId,
        declared: usize,
        actual: usize,
    },

    #[error("Job '{id}' has invalid cadence {every} (must be >= 1)")]
    InvalidCadence { id: JobId, every: u32 },

    #[error("Run timed out after {after:?} ({} jobs completed)", .partial.len())]
    RunTimeout {
        after: Duration,
        partial: Vec<CallRecord>,
    },

    #[error("Run cancelled ({} jobs completed)", .partial.len())]
    RunCancelled { partial: Vec<CallRecord> },

    #[error("Job '{job}' failed: {reason}")]
    RunFailed {
        job: JobId,
        reason: String,
        partial: Vec<CallRecord>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DepjobsError {
    /// Call records collected before a run was aborted, if this error came
    /// from an aborted run.
    pub fn partial_sequence(&self) -> Option<&[CallRecord]> {
        match self {
            DepjobsError::RunTimeout { partial, .. }
            | DepjobsError::RunCancelled { partial }
            | DepjobsError::RunFailed { partial, .. } => Some(partial.as_slice()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DepjobsError>;
