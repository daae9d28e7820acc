// src/dag/launch.rs

//! Per-run shared state and the job launch protocol.
//!
//! Every job reachable from root gets exactly one task per run:
//!
//! 1. **wait-for-upstream**: block on the job's gate until every live
//!    upstream job has signalled.
//! 2. **execute**: run the workload, record the completion and signal each
//!    dependent's gate once.
//! 3. **fan-out**: spawn the task of every dependent that has not been
//!    launched yet in this run. The first upstream to finish spawns it; the
//!    remaining upstreams only signal its gate.
//!
//! Every task of a run is spawned on the run's [`TaskTracker`]. Once the run
//! is cancelled, workloads in flight are dropped and the scheduler waits for
//! the tracker to drain before it returns, so no task outlives its run.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::dag::call_sequence::CallRecorder;
use crate::dag::gate::{CompletionBarrier, GateOutcome, UpstreamGate};
use crate::dag::graph::Graph;
use crate::dag::job::Job;
use crate::dag::plan::RunPlan;
use crate::exec::Workload;
use crate::types::{JobId, JobStatus};

/// First workload failure of a run.
#[derive(Debug, Clone)]
pub(crate) struct JobFailure {
    pub job: JobId,
    pub reason: String,
}

/// Per-run inputs of [`RunState::new`] that do not come from the plan.
pub(crate) struct RunSetup {
    pub run_id: u64,
    pub suppressed: HashSet<JobId>,
    pub recorder: CallRecorder,
    pub max_concurrency: Option<usize>,
    pub workload: Arc<dyn Workload>,
    pub cancel: CancellationToken,
}

/// State shared by all job tasks of one run.
pub(crate) struct RunState {
    pub run_id: u64,
    graph: Arc<Graph>,
    gates: HashMap<JobId, UpstreamGate>,
    launched: HashMap<JobId, AtomicBool>,
    suppressed: HashSet<JobId>,
    pub barrier: CompletionBarrier,
    recorder: CallRecorder,
    pub tasks: TaskTracker,
    permits: Option<Arc<Semaphore>>,
    workload: Arc<dyn Workload>,
    pub cancel: CancellationToken,
    failure: Mutex<Option<JobFailure>>,
    skipped: Mutex<Vec<JobId>>,
}

impl RunState {
    pub fn new(graph: Arc<Graph>, plan: &RunPlan, setup: RunSetup) -> Self {
        let gates = plan
            .order
            .iter()
            .map(|id| (id.clone(), UpstreamGate::new(plan.capacity_of(id))))
            .collect();
        let launched = plan
            .order
            .iter()
            .map(|id| (id.clone(), AtomicBool::new(false)))
            .collect();

        Self {
            run_id: setup.run_id,
            graph,
            gates,
            launched,
            suppressed: setup.suppressed,
            barrier: CompletionBarrier::new(plan.reachable_count()),
            recorder: setup.recorder,
            tasks: TaskTracker::new(),
            permits: setup
                .max_concurrency
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
            workload: setup.workload,
            cancel: setup.cancel,
            failure: Mutex::new(None),
            skipped: Mutex::new(Vec::new()),
        }
    }

    /// Claim the right to spawn `id`'s task. Returns `true` exactly once per
    /// job per run.
    pub fn claim_launch(&self, id: &str) -> bool {
        self.launched
            .get(id)
            .map(|flag| !flag.swap(true, Ordering::AcqRel))
            .unwrap_or(false)
    }

    pub fn failure(&self) -> Option<JobFailure> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn skipped(&self) -> Vec<JobId> {
        let mut skipped = self
            .skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        skipped.sort();
        skipped
    }

    /// Record the first failure of the run and abort every waiting task.
    fn fail(&self, job: &str, reason: String) {
        {
            let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(JobFailure {
                    job: job.to_string(),
                    reason,
                });
            }
        }
        self.cancel.cancel();
    }

    fn signal_dependents(&self, job: &Job) {
        for dep in job.dependents() {
            if let Some(gate) = self.gates.get(dep) {
                gate.signal();
            }
        }
    }
}

/// Spawn the launch task of `id` on the run's task tracker.
pub(crate) fn spawn_launch(state: Arc<RunState>, id: JobId) {
    let tasks = state.tasks.clone();
    tasks.spawn(launch(state, id));
}

/// Full lifecycle of one job within a run.
fn launch(state: Arc<RunState>, id: JobId) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let graph = Arc::clone(&state.graph);
        let job = match graph.lookup(&id) {
            Ok(job) => job,
            Err(err) => {
                state.fail(&id, err.to_string());
                return;
            }
        };

        if wait_for_upstream(&state, job).await == GateOutcome::Cancelled {
            debug!(run_id = state.run_id, job = %id, "run cancelled while waiting for upstream");
            return;
        }

        if state.suppressed.contains(&id) {
            job.mark_skipped();
            state
                .skipped
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(id.clone());
            info!(run_id = state.run_id, job = %id, "cadence not reached; skipping job this cycle");
            state.signal_dependents(job);
        } else if !execute(&state, job).await {
            return;
        }

        state.barrier.signal();

        for dep in job.dependents() {
            if state.claim_launch(dep) {
                spawn_launch(Arc::clone(&state), dep.clone());
            }
        }
    })
}

async fn wait_for_upstream(state: &RunState, job: &Job) -> GateOutcome {
    let Some(gate) = state.gates.get(job.id()) else {
        return GateOutcome::Cancelled;
    };

    debug!(
        run_id = state.run_id,
        job = %job.id(),
        upstream = gate.capacity(),
        "waiting for upstream jobs"
    );

    let outcome = gate.wait(&state.cancel).await;
    if outcome == GateOutcome::Opened && state.cancel.is_cancelled() {
        return GateOutcome::Cancelled;
    }
    outcome
}

/// Run the job's workload and publish its completion. Returns `false` if the
/// job failed or the run was cancelled before it could finish.
async fn execute(state: &RunState, job: &Job) -> bool {
    let _permit = match &state.permits {
        Some(permits) => tokio::select! {
            biased;
            _ = state.cancel.cancelled() => return false,
            permit = Arc::clone(permits).acquire_owned() => permit.ok(),
        },
        None => None,
    };

    let start = state.recorder.tick();
    let started_at = Instant::now();
    job.mark_running(started_at);
    info!(run_id = state.run_id, job = %job.id(), name = %job.name(), "job started");

    let result = tokio::select! {
        biased;
        _ = state.cancel.cancelled() => {
            job.mark_finished(JobStatus::Cancelled, Instant::now());
            warn!(run_id = state.run_id, job = %job.id(), "run aborted; workload interrupted");
            return false;
        }
        result = state.workload.run(job) => result,
    };
    let elapsed = started_at.elapsed();

    match result {
        Ok(()) => {
            job.mark_finished(JobStatus::Completed, Instant::now());
            let end = state.recorder.complete(job.id(), start, elapsed);
            info!(
                run_id = state.run_id,
                job = %job.id(),
                end,
                elapsed_ms = elapsed.as_millis() as u64,
                "job completed"
            );
            state.signal_dependents(job);
            true
        }
        Err(err) => {
            job.mark_finished(JobStatus::Failed, Instant::now());
            error!(run_id = state.run_id, job = %job.id(), error = %err, "job failed");
            state.fail(job.id(), format!("{err:#}"));
            false
        }
    }
}
