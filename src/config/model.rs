// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dag::{Graph, RunOptions};
use crate::errors::{DepjobsError, Result};
use crate::exec::RandomDelay;
use crate::types::JobId;

/// Graph definition document as read from YAML or JSON.
///
/// ```yaml
/// root:
///   name: extract
///   deps: [j2, j3]
/// j2:
///   name: transform
///   deps: [j4]
///   every: 3
/// ```
///
/// Keys are job ids; `deps` lists the jobs this one is upstream of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawGraphDocument {
    pub jobs: BTreeMap<JobId, JobEntry>,
}

/// One job entry of a graph document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    pub name: String,

    /// Ids of the jobs that depend on this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<JobId>,

    /// Run only on every `every`-th scheduling cycle. `0` or absent means
    /// every cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<u32>,
}

impl JobEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            every: None,
        }
    }

    /// Cadence if the entry is periodic.
    pub fn cadence(&self) -> Option<u32> {
        self.every.filter(|e| *e > 0)
    }
}

/// A validated graph document.
///
/// Only obtainable through `TryFrom<RawGraphDocument>` (see
/// [`crate::config::validate`]) or [`GraphDocument::from_graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GraphDocument {
    jobs: BTreeMap<JobId, JobEntry>,
}

impl GraphDocument {
    pub(crate) fn new_unchecked(jobs: BTreeMap<JobId, JobEntry>) -> Self {
        Self { jobs }
    }

    /// Snapshot a built graph back into document form.
    pub fn from_graph(graph: &Graph) -> Self {
        let jobs = graph
            .jobs()
            .map(|job| {
                let entry = JobEntry {
                    name: job.name().to_string(),
                    deps: job.dependents().to_vec(),
                    every: graph.cadence_of(job.id()),
                };
                (job.id().to_string(), entry)
            })
            .collect();
        Self { jobs }
    }

    pub fn jobs(&self) -> &BTreeMap<JobId, JobEntry> {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of other entries listing `id` in their `deps`.
    pub fn num_upstream(&self, id: &str) -> usize {
        self.jobs
            .iter()
            .filter(|(other, entry)| other.as_str() != id && entry.deps.iter().any(|d| d == id))
            .count()
    }
}

/// Runner settings as read from a TOML file.
///
/// ```toml
/// [runner]
/// max_concurrency = 4
/// run_timeout = "30s"
/// strict_reachability = false
///
/// [delay]
/// min = "1ms"
/// max = "2000ms"
///
/// [cycle]
/// interval = "1s"
/// count = 3
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub delay: DelaySection,

    #[serde(default)]
    pub cycle: CycleSection,
}

/// `[runner]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerSection {
    /// Upper bound on concurrently executing jobs. Unbounded if absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Duration string (e.g. `"30s"`) after which a run fails.
    #[serde(default)]
    pub run_timeout: Option<String>,

    /// Fail runs of graphs that contain jobs unreachable from root.
    #[serde(default)]
    pub strict_reachability: bool,
}

/// `[delay]` section: bounds of the simulated work time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelaySection {
    #[serde(default)]
    pub min: Option<String>,

    #[serde(default)]
    pub max: Option<String>,
}

/// `[cycle]` section: repeated scheduling for periodic graphs.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleSection {
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Number of cycles to run.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_interval() -> String {
    "1s".to_string()
}

fn default_count() -> u32 {
    1
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            count: default_count(),
        }
    }
}

impl RunnerConfig {
    pub fn run_options(&self) -> Result<RunOptions> {
        let run_timeout = self
            .runner
            .run_timeout
            .as_deref()
            .map(|s| parse_duration(s).map_err(DepjobsError::Config))
            .transpose()?;

        Ok(RunOptions {
            max_concurrency: self.runner.max_concurrency,
            run_timeout,
            strict_reachability: self.runner.strict_reachability,
        })
    }

    /// Delay provider for the simulated workload.
    pub fn delay(&self) -> Result<RandomDelay> {
        let defaults = RandomDelay::default();
        let min = match self.delay.min.as_deref() {
            Some(s) => parse_duration(s).map_err(DepjobsError::Config)?,
            None => defaults.min(),
        };
        let max = match self.delay.max.as_deref() {
            Some(s) => parse_duration(s).map_err(DepjobsError::Config)?,
            None => defaults.max(),
        };
        Ok(RandomDelay::new(min, max))
    }

    pub fn cycle_interval(&self) -> Result<Duration> {
        parse_duration(&self.cycle.interval).map_err(DepjobsError::Config)
    }
}

/// Parse `<int><unit>` durations, with unit one of `ms`, `s`, `m`, `h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        unit => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn runner_config_defaults() {
        let cfg: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.run_options().unwrap(), RunOptions::default());
        assert_eq!(cfg.delay().unwrap(), RandomDelay::default());
        assert_eq!(cfg.cycle_interval().unwrap(), Duration::from_secs(1));
        assert_eq!(cfg.cycle.count, 1);
    }

    #[test]
    fn num_upstream_counts_entries_not_edges_to_self() {
        let mut jobs = BTreeMap::new();
        let mut root = JobEntry::new("root");
        root.deps = vec!["j2".into(), "j3".into()];
        let mut j2 = JobEntry::new("j2");
        j2.deps = vec!["j3".into()];
        jobs.insert("root".to_string(), root);
        jobs.insert("j2".to_string(), j2);
        jobs.insert("j3".to_string(), JobEntry::new("j3"));

        let doc = GraphDocument::new_unchecked(jobs);
        assert_eq!(doc.num_upstream("root"), 0);
        assert_eq!(doc.num_upstream("j2"), 1);
        assert_eq!(doc.num_upstream("j3"), 2);
    }

    #[test]
    fn zero_cadence_is_not_periodic() {
        let mut entry = JobEntry::new("x");
        entry.every = Some(0);
        assert_eq!(entry.cadence(), None);
        entry.every = Some(4);
        assert_eq!(entry.cadence(), Some(4));
    }
}
