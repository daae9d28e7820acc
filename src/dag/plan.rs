// src/dag/plan.rs

//! Structural checks performed at the start of every run.
//!
//! Everything that would otherwise make a run hang (missing root, cycles,
//! gates sized differently from the real in-degree) is rejected here, before
//! any job task is spawned.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::graph::Graph;
use crate::errors::{DepjobsError, Result};
use crate::types::JobId;

/// What a run will execute, derived from a validated graph.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Jobs reachable from root, in topological order (root first).
    pub order: Vec<JobId>,
    /// Effective gate capacity per reachable job.
    pub capacities: HashMap<JobId, usize>,
    /// Jobs with no path from root, sorted by id.
    pub unreachable: Vec<JobId>,
}

impl RunPlan {
    /// Validate `graph` and compute the plan.
    ///
    /// With `strict_reachability` unreachable jobs are an error; otherwise
    /// they are logged and listed in [`RunPlan::unreachable`].
    pub fn prepare(graph: &Graph, strict_reachability: bool) -> Result<Self> {
        let reachable = graph.reachable_from_root()?;
        let topo = graph.topological_order()?;

        for job in graph.jobs() {
            let actual = graph.in_degree(job.id())?;
            if job.upstream_count() != actual {
                return Err(DepjobsError::UpstreamMismatch {
                    id: job.id().to_string(),
                    declared: job.upstream_count(),
                    actual,
                });
            }
        }

        let mut unreachable: Vec<JobId> = topo
            .iter()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        unreachable.sort();

        if !unreachable.is_empty() {
            if strict_reachability {
                return Err(DepjobsError::UnreachableNode(unreachable));
            }
            warn!(?unreachable, "jobs unreachable from root will not run");
        }

        let order: Vec<JobId> = topo.into_iter().filter(|id| reachable.contains(id)).collect();

        // Edges from unreachable jobs never deliver a signal, so they do not
        // count towards the gate of a reachable job.
        let capacities = order
            .iter()
            .map(|id| {
                let upstream = graph.upstream_of(id)?;
                let declared = upstream.len();
                let live = upstream
                    .into_iter()
                    .filter(|up| reachable.contains(*up))
                    .count();
                if live != declared {
                    warn!(
                        job = %id,
                        declared,
                        live,
                        "ignoring upstream edges from unreachable jobs"
                    );
                }
                Ok::<_, DepjobsError>((id.clone(), live))
            })
            .collect::<Result<_>>()?;

        debug!(jobs = order.len(), unreachable = unreachable.len(), "run plan prepared");

        Ok(Self {
            order,
            capacities,
            unreachable,
        })
    }

    /// Number of jobs the completion barrier waits for.
    pub fn reachable_count(&self) -> usize {
        self.order.len()
    }

    pub fn capacity_of(&self, id: &str) -> usize {
        self.capacities.get(id).copied().unwrap_or(0)
    }
}
