#![allow(dead_code)]

use std::sync::Arc;

use depjobs::config::{GraphDocument, JobEntry, RawGraphDocument, build_graph};
use depjobs::dag::Graph;

/// Builder for graph documents to simplify test setup.
///
/// Jobs are described the way a document describes them: each job lists its
/// `deps` (the jobs it unblocks). Gate sizes are derived by the loader.
pub struct GraphBuilder {
    doc: RawGraphDocument,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            doc: RawGraphDocument::default(),
        }
    }

    pub fn with_job(mut self, id: &str, deps: &[&str]) -> Self {
        let mut entry = JobEntry::new(id);
        entry.deps = deps.iter().map(|d| d.to_string()).collect();
        self.doc.jobs.insert(id.to_string(), entry);
        self
    }

    /// Like `with_job`, but the job only runs every `every` cycles.
    pub fn with_periodic_job(mut self, id: &str, deps: &[&str], every: u32) -> Self {
        self = self.with_job(id, deps);
        if let Some(entry) = self.doc.jobs.get_mut(id) {
            entry.every = Some(every);
        }
        self
    }

    pub fn raw(self) -> RawGraphDocument {
        self.doc
    }

    pub fn document(self) -> GraphDocument {
        GraphDocument::try_from(self.doc).expect("Failed to build valid document from builder")
    }

    pub fn build(self) -> Graph {
        build_graph(&self.document()).expect("Failed to build graph from builder")
    }

    pub fn build_shared(self) -> Arc<Graph> {
        Arc::new(self.build())
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `root -> j2 -> ... -> jN`.
pub fn chain(len: usize) -> Graph {
    let ids: Vec<String> = std::iter::once("root".to_string())
        .chain((2..=len).map(|i| format!("j{i}")))
        .collect();

    let mut builder = GraphBuilder::new();
    for (i, id) in ids.iter().enumerate() {
        let deps: Vec<&str> = ids.get(i + 1).map(|s| s.as_str()).into_iter().collect();
        builder = builder.with_job(id, &deps);
    }
    builder.build()
}

/// `root -> {j2, j3} -> j4`.
pub fn diamond() -> Graph {
    GraphBuilder::new()
        .with_job("root", &["j2", "j3"])
        .with_job("j2", &["j4"])
        .with_job("j3", &["j4"])
        .with_job("j4", &[])
        .build()
}
