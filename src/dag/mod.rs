// src/dag/mod.rs

//! Job graph and the concurrent scheduling engine.
//!
//! - [`job`] holds a single node: identity, dependents and run status.
//! - [`graph`] owns the node table and its topology.
//! - [`gate`] provides the counting rendezvous behind upstream gates and the
//!   completion barrier.
//! - [`plan`] validates a graph at run entry and sizes gates and barrier.
//! - [`launch`] implements the per-job wait/execute/fan-out protocol.
//! - [`scheduler`] drives a run and collects its [`RunReport`].
//! - [`call_sequence`] is the ordered completion log of a run.
//! - [`periodic`] gates jobs that only run every N cycles.

pub mod call_sequence;
pub mod gate;
pub mod graph;
pub mod job;
mod launch;
pub mod periodic;
pub mod plan;
pub mod scheduler;

pub use call_sequence::{CallRecord, CallRecorder, CallSequenceDrain};
pub use gate::{CompletionBarrier, GateOutcome, Rendezvous, UpstreamGate};
pub use graph::Graph;
pub use job::{Job, JobState};
pub use periodic::PeriodicGate;
pub use plan::RunPlan;
pub use scheduler::{RunOptions, RunReport, Scheduler};
pub use crate::types::{JobId, JobStatus, ROOT_ID};
