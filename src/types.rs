use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical job identifier type used throughout the crate.
pub type JobId = String;

/// Reserved id of the entry-point job of every graph.
pub const ROOT_ID: &str = "root";

/// Lifecycle state of a job within a run.
///
/// - `Scheduled`: the job is part of the graph and has not started yet.
/// - `Running`: the job's gate opened and its workload is in progress.
/// - `Completed`: the workload finished and dependents were signalled.
/// - `Skipped`: a periodic cadence suppressed the job for this cycle.
/// - `Failed`: the workload returned an error.
/// - `Cancelled`: the run aborted while the workload was in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Scheduled,
    Running,
    Completed,
    Skipped,
    Failed,
    Cancelled,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Scheduled
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Skipped => "skipped",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(JobStatus::Scheduled),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "skipped" => Ok(JobStatus::Skipped),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("invalid job status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Completed".parse::<JobStatus>(), Ok(JobStatus::Completed));
        assert_eq!(" skipped ".parse::<JobStatus>(), Ok(JobStatus::Skipped));
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn status_display_matches_serde_name() {
        assert_eq!(JobStatus::Scheduled.to_string(), "scheduled");
        assert_eq!(JobStatus::default(), JobStatus::Scheduled);
    }
}
