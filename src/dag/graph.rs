// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use tracing::{debug, warn};

use crate::dag::job::Job;
use crate::errors::{DepjobsError, Result};
use crate::types::{JobId, ROOT_ID};

/// Job graph: the single owned node table plus its topology.
///
/// Edges are stored twice: as ordered dependent ids on each [`Job`] (the
/// launch order) and in a `petgraph` mirror used for cycle checks,
/// reachability and topological ordering. Both are only written by
/// [`Graph::add_dependents`], so they never diverge.
#[derive(Debug)]
pub struct Graph {
    nodes: HashMap<JobId, Job>,
    root: JobId,
    cadence: BTreeMap<JobId, u32>,
    topology: DiGraph<JobId, ()>,
    index: HashMap<JobId, NodeIndex>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Empty graph whose entry point is [`ROOT_ID`].
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            root: ROOT_ID.to_string(),
            cadence: BTreeMap::new(),
            topology: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Register a job with status `scheduled` and a gate of capacity
    /// `num_upstream`.
    pub fn add(
        &mut self,
        id: impl Into<JobId>,
        name: impl Into<String>,
        num_upstream: usize,
    ) -> Result<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(DepjobsError::DuplicateJobId(id));
        }

        let idx = self.topology.add_node(id.clone());
        self.index.insert(id.clone(), idx);
        debug!(job = %id, num_upstream, "added job");
        self.nodes.insert(id.clone(), Job::new(id, name.into(), num_upstream));
        Ok(())
    }

    /// Append `deps` to the dependents of `id` (edges `id -> dep`).
    ///
    /// The whole call is validated before any edge is added: every id must be
    /// registered and no edge may close a cycle. Repeated edges are ignored.
    pub fn add_dependents<I, S>(&mut self, id: &str, deps: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<JobId>,
    {
        let from = self.node_index(id)?;

        let mut new_deps: Vec<(JobId, NodeIndex)> = Vec::new();
        for dep in deps {
            let dep = dep.into();
            let to = self.node_index(&dep)?;

            if dep == id || has_path_connecting(&self.topology, to, from, None) {
                return Err(DepjobsError::CycleDetected(format!(
                    "edge '{id}' -> '{dep}' closes a cycle"
                )));
            }

            let exists = self.topology.contains_edge(from, to)
                || new_deps.iter().any(|(d, _)| *d == dep);
            if exists {
                warn!(job = %id, dep = %dep, "ignoring repeated dependency edge");
                continue;
            }
            new_deps.push((dep, to));
        }

        for (_, to) in &new_deps {
            self.topology.add_edge(from, *to, ());
        }

        let job = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| DepjobsError::UnknownJobReference(id.to_string()))?;
        job.push_dependents(new_deps.into_iter().map(|(d, _)| d));
        Ok(())
    }

    /// Configure `id` to run only on every `every`-th scheduling cycle.
    pub fn add_periodic(&mut self, id: &str, every: u32) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(DepjobsError::UnknownJobReference(id.to_string()));
        }
        if every == 0 {
            return Err(DepjobsError::InvalidCadence {
                id: id.to_string(),
                every,
            });
        }
        self.cadence.insert(id.to_string(), every);
        Ok(())
    }

    /// Look up a job; unknown ids are an error, never a placeholder.
    pub fn lookup(&self, id: &str) -> Result<&Job> {
        self.nodes
            .get(id)
            .ok_or_else(|| DepjobsError::UnknownJobReference(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All jobs, in no particular order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.nodes.values()
    }

    /// Immediate dependents of `id` (jobs it is upstream of).
    pub fn dependents_of(&self, id: &str) -> Result<&[JobId]> {
        self.lookup(id).map(Job::dependents)
    }

    /// Immediate upstream jobs of `id`.
    pub fn upstream_of(&self, id: &str) -> Result<Vec<&str>> {
        let idx = self.node_index(id)?;
        Ok(self
            .topology
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.topology[n].as_str())
            .collect())
    }

    /// Actual number of edges pointing into `id`.
    pub fn in_degree(&self, id: &str) -> Result<usize> {
        let idx = self.node_index(id)?;
        Ok(self
            .topology
            .neighbors_directed(idx, Direction::Incoming)
            .count())
    }

    /// Configured cadence of `id`, if it is periodic.
    pub fn cadence_of(&self, id: &str) -> Option<u32> {
        self.cadence.get(id).copied()
    }

    /// All periodic jobs and their cadence, ordered by id.
    pub fn periodic(&self) -> impl Iterator<Item = (&str, u32)> {
        self.cadence.iter().map(|(id, every)| (id.as_str(), *every))
    }

    /// Ids of every job with a path from root (root included).
    pub fn reachable_from_root(&self) -> Result<HashSet<JobId>> {
        let &start = self
            .index
            .get(&self.root)
            .ok_or_else(|| DepjobsError::MissingRoot(self.root.clone()))?;

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.topology, start);
        while let Some(idx) = dfs.next(&self.topology) {
            reachable.insert(self.topology[idx].clone());
        }
        Ok(reachable)
    }

    /// Job ids in a dependency-respecting order.
    pub fn topological_order(&self) -> Result<Vec<JobId>> {
        toposort(&self.topology, None)
            .map(|order| order.into_iter().map(|i| self.topology[i].clone()).collect())
            .map_err(|cycle| {
                DepjobsError::CycleDetected(format!(
                    "cycle involving job '{}'",
                    self.topology[cycle.node_id()]
                ))
            })
    }

    pub(crate) fn reset_states(&self) {
        for job in self.nodes.values() {
            job.reset();
        }
    }

    fn node_index(&self, id: &str) -> Result<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DepjobsError::UnknownJobReference(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Graph {
        let mut g = Graph::new();
        g.add("root", "root", 0).unwrap();
        g.add("j2", "j2", 1).unwrap();
        g.add("j3", "j3", 1).unwrap();
        g.add("j4", "j4", 2).unwrap();
        g.add_dependents("root", ["j2", "j3"]).unwrap();
        g.add_dependents("j2", ["j4"]).unwrap();
        g.add_dependents("j3", ["j4"]).unwrap();
        g
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut g = Graph::new();
        g.add("root", "a", 0).unwrap();
        assert!(matches!(
            g.add("root", "b", 0),
            Err(DepjobsError::DuplicateJobId(id)) if id == "root"
        ));
    }

    #[test]
    fn unknown_references_are_rejected_without_partial_edges() {
        let mut g = Graph::new();
        g.add("root", "root", 0).unwrap();
        g.add("j2", "j2", 1).unwrap();

        assert!(matches!(
            g.add_dependents("root", ["j2", "ghost"]),
            Err(DepjobsError::UnknownJobReference(id)) if id == "ghost"
        ));
        assert!(g.dependents_of("root").unwrap().is_empty());

        assert!(matches!(
            g.add_dependents("ghost", ["j2"]),
            Err(DepjobsError::UnknownJobReference(id)) if id == "ghost"
        ));
    }

    #[test]
    fn closing_a_cycle_is_rejected() {
        let mut g = Graph::new();
        g.add("j2", "j2", 1).unwrap();
        g.add("j3", "j3", 1).unwrap();
        g.add_dependents("j2", ["j3"]).unwrap();

        assert!(matches!(
            g.add_dependents("j3", ["j2"]),
            Err(DepjobsError::CycleDetected(_))
        ));
        assert!(matches!(
            g.add_dependents("j2", ["j2"]),
            Err(DepjobsError::CycleDetected(_))
        ));
    }

    #[test]
    fn lookup_fails_for_missing_id() {
        let g = diamond();
        assert_eq!(g.lookup("j4").unwrap().upstream_count(), 2);
        assert!(matches!(
            g.lookup("nope"),
            Err(DepjobsError::UnknownJobReference(_))
        ));
    }

    #[test]
    fn edges_are_ids_into_the_node_table() {
        let g = diamond();
        assert_eq!(
            g.dependents_of("root").unwrap(),
            ["j2".to_string(), "j3".to_string()]
        );
        assert_eq!(g.in_degree("j4").unwrap(), 2);
        assert_eq!(g.in_degree("root").unwrap(), 0);

        let mut up = g.upstream_of("j4").unwrap();
        up.sort();
        assert_eq!(up, vec!["j2", "j3"]);
    }

    #[test]
    fn repeated_edges_are_ignored() {
        let mut g = diamond();
        g.add_dependents("root", ["j2"]).unwrap();
        assert_eq!(g.dependents_of("root").unwrap().len(), 2);
        assert_eq!(g.in_degree("j2").unwrap(), 1);
    }

    #[test]
    fn edge_queries_reject_unknown_ids() {
        let g = diamond();
        assert!(matches!(
            g.dependents_of("ghost"),
            Err(DepjobsError::UnknownJobReference(id)) if id == "ghost"
        ));
        assert!(matches!(
            g.upstream_of("ghost"),
            Err(DepjobsError::UnknownJobReference(id)) if id == "ghost"
        ));
        assert!(matches!(
            g.in_degree("ghost"),
            Err(DepjobsError::UnknownJobReference(id)) if id == "ghost"
        ));
    }

    #[test]
    fn reachability_excludes_islands() {
        let mut g = diamond();
        g.add("island", "island", 0).unwrap();
        let reachable = g.reachable_from_root().unwrap();
        assert_eq!(reachable.len(), 4);
        assert!(!reachable.contains("island"));
    }

    #[test]
    fn reachability_requires_root() {
        let mut g = Graph::new();
        g.add("j2", "j2", 0).unwrap();
        assert!(matches!(
            g.reachable_from_root(),
            Err(DepjobsError::MissingRoot(_))
        ));
    }

    #[test]
    fn periodic_requires_known_id_and_positive_cadence() {
        let mut g = diamond();
        g.add_periodic("j3", 3).unwrap();
        assert_eq!(g.cadence_of("j3"), Some(3));
        assert!(matches!(
            g.add_periodic("j3", 0),
            Err(DepjobsError::InvalidCadence { every: 0, .. })
        ));
        assert!(matches!(
            g.add_periodic("ghost", 2),
            Err(DepjobsError::UnknownJobReference(_))
        ));
    }

    #[test]
    fn topological_order_respects_edges() {
        let g = diamond();
        let order = g.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert_eq!(pos("root"), 0);
        assert!(pos("j2") < pos("j4"));
        assert!(pos("j3") < pos("j4"));
    }
}
