// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dag::{Graph, RunReport, Scheduler};
use crate::errors::Result;

/// Re-runs a whole graph on a fixed interval.
///
/// Each cycle is a complete [`Scheduler::run`]; periodic jobs are gated by
/// the scheduler's own cadence counters, so they only execute on qualifying
/// cycles while every other job runs every cycle.
pub struct CycleRuntime {
    scheduler: Scheduler,
    interval: Duration,
    max_cycles: Option<u32>,
}

impl fmt::Debug for CycleRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleRuntime")
            .field("scheduler", &self.scheduler)
            .field("interval", &self.interval)
            .field("max_cycles", &self.max_cycles)
            .finish()
    }
}

impl CycleRuntime {
    /// `max_cycles = None` runs until cancelled.
    pub fn new(scheduler: Scheduler, interval: Duration, max_cycles: Option<u32>) -> Self {
        Self {
            scheduler,
            interval,
            max_cycles,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }

    /// Main loop.
    ///
    /// - Waits for the next interval tick (the first tick fires immediately).
    /// - Runs the graph once and collects its report.
    /// - Stops after `max_cycles`, when `cancel` fires, or on the first failed
    ///   cycle (whose error is returned).
    pub async fn run(&mut self, graph: Arc<Graph>, cancel: CancellationToken) -> Result<Vec<RunReport>> {
        info!(interval = ?self.interval, max_cycles = ?self.max_cycles, "cycle runtime started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reports = Vec::new();
        let mut cycle: u32 = 0;

        loop {
            if self.max_cycles.is_some_and(|max| cycle >= max) {
                info!(cycles = cycle, "cycle limit reached; stopping");
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(cycles = cycle, "cancellation requested; stopping cycle runtime");
                    break;
                }
                _ = ticker.tick() => {}
            }

            cycle += 1;
            debug!(cycle, "starting scheduling cycle");

            let report = self
                .scheduler
                .run_until_cancelled(Arc::clone(&graph), cancel.clone())
                .await?;
            reports.push(report);
        }

        info!(cycles = reports.len(), "cycle runtime exiting");
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::RunOptions;
    use crate::exec::{FixedDelay, SimulatedWorkload};

    fn periodic_graph() -> Arc<Graph> {
        let mut g = Graph::new();
        g.add("root", "root", 0).unwrap();
        g.add("hourly", "hourly", 1).unwrap();
        g.add("report", "report", 1).unwrap();
        g.add_dependents("root", ["hourly"]).unwrap();
        g.add_dependents("hourly", ["report"]).unwrap();
        g.add_periodic("hourly", 2).unwrap();
        Arc::new(g)
    }

    fn scheduler() -> Scheduler {
        Scheduler::with_workload(
            RunOptions::default(),
            Arc::new(SimulatedWorkload::new(FixedDelay(Duration::from_millis(1)))),
        )
    }

    #[tokio::test]
    async fn periodic_job_runs_on_qualifying_cycles_only() {
        let mut runtime = CycleRuntime::new(scheduler(), Duration::from_millis(5), Some(4));
        let reports = runtime
            .run(periodic_graph(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reports.len(), 4);
        let ran_hourly: Vec<bool> = reports
            .iter()
            .map(|r| r.record_of("hourly").is_some())
            .collect();
        assert_eq!(ran_hourly, vec![false, true, false, true]);

        // Downstream of a suppressed job still runs every cycle.
        assert!(reports.iter().all(|r| r.record_of("report").is_some()));
        assert_eq!(reports[0].skipped, vec!["hourly".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_runtime_stops_without_cycles() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut runtime = CycleRuntime::new(scheduler(), Duration::from_millis(5), None);
        let reports = runtime.run(periodic_graph(), cancel).await.unwrap();
        assert!(reports.is_empty());
        assert_eq!(runtime.scheduler().runs_started(), 0);
    }
}
