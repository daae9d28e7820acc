// src/dag/scheduler.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::call_sequence::{self, CallRecord};
use crate::dag::gate::GateOutcome;
use crate::dag::graph::Graph;
use crate::dag::launch::{RunSetup, RunState, spawn_launch};
use crate::dag::periodic::PeriodicGate;
use crate::dag::plan::RunPlan;
use crate::errors::{DepjobsError, Result};
use crate::exec::{RandomDelay, SimulatedWorkload, Workload};
use crate::types::JobId;

/// Knobs for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Upper bound on concurrently executing jobs; `None` is unbounded.
    pub max_concurrency: Option<usize>,
    /// Fail the run with `RunTimeout` if it takes longer than this.
    pub run_timeout: Option<Duration>,
    /// Reject graphs containing jobs unreachable from root.
    pub strict_reachability: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Monotonically increasing per-scheduler run identifier.
    pub run_id: u64,
    /// Completion records in completion order.
    pub sequence: Vec<CallRecord>,
    /// Jobs suppressed by their cadence this cycle.
    pub skipped: Vec<JobId>,
    /// Jobs with no path from root; never executed.
    pub unreachable: Vec<JobId>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Job ids in completion order.
    pub fn ids(&self) -> Vec<&str> {
        self.sequence.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn record_of(&self, id: &str) -> Option<&CallRecord> {
        self.sequence.iter().find(|r| r.id == id)
    }
}

/// Drives runs of a [`Graph`].
///
/// The scheduler owns:
/// - the run options
/// - the workload every job executes
/// - the periodic tick counters (so cadence state never leaks between
///   schedulers)
/// - the run counter
pub struct Scheduler {
    options: RunOptions,
    workload: Arc<dyn Workload>,
    periodic: PeriodicGate,
    run_counter: u64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("options", &self.options)
            .field("periodic", &self.periodic)
            .field("run_counter", &self.run_counter)
            .finish_non_exhaustive()
    }
}

enum Outcome {
    Completed,
    Aborted,
    TimedOut(Duration),
}

impl Scheduler {
    /// Scheduler running the default simulated workload.
    pub fn new(options: RunOptions) -> Self {
        Self::with_workload(options, Arc::new(SimulatedWorkload::new(RandomDelay::default())))
    }

    pub fn with_workload(options: RunOptions, workload: Arc<dyn Workload>) -> Self {
        Self {
            options,
            workload,
            periodic: PeriodicGate::new(),
            run_counter: 0,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn periodic(&self) -> &PeriodicGate {
        &self.periodic
    }

    /// Number of runs started so far.
    pub fn runs_started(&self) -> u64 {
        self.run_counter
    }

    /// Run every job reachable from root once, respecting dependencies.
    pub async fn run(&mut self, graph: Arc<Graph>) -> Result<RunReport> {
        self.run_until_cancelled(graph, CancellationToken::new()).await
    }

    /// Like [`Scheduler::run`], but aborts with `RunCancelled` when `cancel`
    /// fires. The token is only observed; the run never cancels it.
    pub async fn run_until_cancelled(
        &mut self,
        graph: Arc<Graph>,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let plan = RunPlan::prepare(&graph, self.options.strict_reachability)?;

        self.run_counter += 1;
        let run_id = self.run_counter;

        let suppressed = self.suppressed_jobs(&graph, &plan);
        let (recorder, drain) = call_sequence::channel(plan.reachable_count());

        graph.reset_states();

        let state = Arc::new(RunState::new(
            Arc::clone(&graph),
            &plan,
            RunSetup {
                run_id,
                suppressed,
                recorder,
                max_concurrency: self.options.max_concurrency,
                workload: Arc::clone(&self.workload),
                cancel: cancel.child_token(),
            },
        ));

        info!(
            run_id,
            jobs = plan.reachable_count(),
            unreachable = plan.unreachable.len(),
            "run started"
        );
        let started = Instant::now();

        let root = graph.root_id().to_string();
        if state.claim_launch(&root) {
            spawn_launch(Arc::clone(&state), root);
        }

        let outcome = match self.options.run_timeout {
            Some(limit) => tokio::select! {
                outcome = wait_for_completion(&state) => outcome,
                _ = tokio::time::sleep(limit) => Outcome::TimedOut(limit),
            },
            None => wait_for_completion(&state).await,
        };

        // Stop every task of this run and let them all exit before the log is
        // closed; job states are final from here on.
        state.cancel.cancel();
        state.tasks.close();
        state.tasks.wait().await;
        let sequence = drain.drain();
        let elapsed = started.elapsed();

        match outcome {
            Outcome::Completed => {
                let skipped = state.skipped();
                info!(
                    run_id,
                    executed = sequence.len(),
                    skipped = skipped.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run completed"
                );
                Ok(RunReport {
                    run_id,
                    sequence,
                    skipped,
                    unreachable: plan.unreachable,
                    elapsed,
                })
            }
            Outcome::TimedOut(after) => {
                warn!(run_id, ?after, completed = sequence.len(), "run timed out");
                Err(DepjobsError::RunTimeout {
                    after,
                    partial: sequence,
                })
            }
            Outcome::Aborted => match state.failure() {
                Some(failure) => {
                    warn!(run_id, job = %failure.job, "run failed");
                    Err(DepjobsError::RunFailed {
                        job: failure.job,
                        reason: failure.reason,
                        partial: sequence,
                    })
                }
                None => {
                    info!(run_id, completed = sequence.len(), "run cancelled");
                    Err(DepjobsError::RunCancelled { partial: sequence })
                }
            },
        }
    }

    /// Advance the cadence of every reachable periodic job and collect the
    /// ones that must sit this cycle out.
    fn suppressed_jobs(&mut self, graph: &Graph, plan: &RunPlan) -> HashSet<JobId> {
        let mut suppressed = HashSet::new();
        for (id, every) in graph.periodic() {
            if !plan.capacities.contains_key(id) {
                continue;
            }
            if !self.periodic.time_to_run(id, every) {
                debug!(job = %id, every, "periodic job suppressed this cycle");
                suppressed.insert(id.to_string());
            }
        }
        suppressed
    }
}

async fn wait_for_completion(state: &RunState) -> Outcome {
    match state.barrier.wait(&state.cancel).await {
        GateOutcome::Opened => Outcome::Completed,
        GateOutcome::Cancelled => Outcome::Aborted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::FixedDelay;

    fn chain() -> Arc<Graph> {
        let mut g = Graph::new();
        g.add("root", "root", 0).unwrap();
        g.add("j2", "j2", 1).unwrap();
        g.add("j3", "j3", 1).unwrap();
        g.add_dependents("root", ["j2"]).unwrap();
        g.add_dependents("j2", ["j3"]).unwrap();
        Arc::new(g)
    }

    fn fast_scheduler() -> Scheduler {
        Scheduler::with_workload(
            RunOptions::default(),
            Arc::new(SimulatedWorkload::new(FixedDelay(Duration::from_millis(1)))),
        )
    }

    #[tokio::test]
    async fn chain_runs_in_order_with_strict_ticks() {
        let mut scheduler = fast_scheduler();
        let report = scheduler.run(chain()).await.unwrap();

        assert_eq!(report.ids(), vec!["root", "j2", "j3"]);
        for pair in report.sequence.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        assert_eq!(report.run_id, 1);
    }

    #[tokio::test]
    async fn statuses_are_completed_after_run() {
        let graph = chain();
        let mut scheduler = fast_scheduler();
        scheduler.run(Arc::clone(&graph)).await.unwrap();

        for job in graph.jobs() {
            assert_eq!(job.status(), crate::types::JobStatus::Completed);
            assert!(job.snapshot().exec_duration.is_some());
        }
    }

    #[tokio::test]
    async fn repeated_runs_reuse_the_graph() {
        let graph = chain();
        let mut scheduler = fast_scheduler();
        for expected in 1..=3 {
            let report = scheduler.run(Arc::clone(&graph)).await.unwrap();
            assert_eq!(report.run_id, expected);
            assert_eq!(report.sequence.len(), 3);
        }
        assert_eq!(scheduler.runs_started(), 3);
    }

    #[tokio::test]
    async fn structural_errors_do_not_start_a_run() {
        let mut g = Graph::new();
        g.add("j2", "j2", 0).unwrap();
        let mut scheduler = fast_scheduler();

        let err = scheduler.run(Arc::new(g)).await.unwrap_err();
        assert!(matches!(err, DepjobsError::MissingRoot(_)));
        assert_eq!(scheduler.runs_started(), 0);
    }
}
