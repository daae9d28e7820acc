// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{GraphDocument, RawGraphDocument, RunnerConfig, parse_duration};
use crate::errors::{DepjobsError, Result};
use crate::types::ROOT_ID;

impl TryFrom<RawGraphDocument> for GraphDocument {
    type Error = crate::errors::DepjobsError;

    fn try_from(raw: RawGraphDocument) -> std::result::Result<Self, Self::Error> {
        validate_document(&raw)?;
        Ok(GraphDocument::new_unchecked(raw.jobs))
    }
}

/// Check a raw graph document before any job is built from it.
pub fn validate_document(doc: &RawGraphDocument) -> Result<()> {
    ensure_has_jobs(doc)?;
    ensure_has_root(doc)?;
    validate_dependencies(doc)?;
    validate_dag(doc)?;
    Ok(())
}

fn ensure_has_jobs(doc: &RawGraphDocument) -> Result<()> {
    if doc.jobs.is_empty() {
        return Err(DepjobsError::GraphLoad(
            "graph document must contain at least one job".to_string(),
        ));
    }
    Ok(())
}

fn ensure_has_root(doc: &RawGraphDocument) -> Result<()> {
    if !doc.jobs.contains_key(ROOT_ID) {
        return Err(DepjobsError::MissingRoot(ROOT_ID.to_string()));
    }
    Ok(())
}

fn validate_dependencies(doc: &RawGraphDocument) -> Result<()> {
    for (id, entry) in doc.jobs.iter() {
        for dep in entry.deps.iter() {
            if !doc.jobs.contains_key(dep) {
                return Err(DepjobsError::UnknownJobReference(dep.clone()));
            }
            if dep == id {
                return Err(DepjobsError::CycleDetected(format!(
                    "job '{}' lists itself in `deps`",
                    id
                )));
            }
            if dep == ROOT_ID {
                return Err(DepjobsError::GraphLoad(format!(
                    "job '{}' lists '{}' in `deps`; the root job cannot have upstream jobs",
                    id, ROOT_ID
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(doc: &RawGraphDocument) -> Result<()> {
    // Edge direction: job -> dep, i.e. upstream -> downstream.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in doc.jobs.keys() {
        graph.add_node(id.as_str());
    }

    for (id, entry) in doc.jobs.iter() {
        for dep in entry.deps.iter() {
            graph.add_edge(id.as_str(), dep.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DepjobsError::CycleDetected(format!(
            "cycle detected in job graph involving job '{}'",
            cycle.node_id()
        ))),
    }
}

/// Check runner settings for values that would make every run fail.
pub fn validate_settings(cfg: &RunnerConfig) -> Result<()> {
    if cfg.runner.max_concurrency == Some(0) {
        return Err(DepjobsError::Config(
            "[runner].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    cfg.run_options()?;

    // `RandomDelay::new` would silently swap reversed bounds.
    cfg.delay()?;
    if let (Some(min), Some(max)) = (&cfg.delay.min, &cfg.delay.max) {
        let min = parse_duration(min).map_err(DepjobsError::Config)?;
        let max = parse_duration(max).map_err(DepjobsError::Config)?;
        if min > max {
            return Err(DepjobsError::Config(format!(
                "[delay].min ({:?}) must not exceed [delay].max ({:?})",
                min, max
            )));
        }
    }

    if cfg.cycle.count == 0 {
        return Err(DepjobsError::Config(
            "[cycle].count must be >= 1 (got 0)".to_string(),
        ));
    }
    cfg.cycle_interval()?;

    Ok(())
}
