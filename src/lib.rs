// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_graph, load_settings, store_document};
use crate::config::model::RunnerConfig;
use crate::dag::{CallRecord, Graph, RunPlan, Scheduler};
use crate::engine::CycleRuntime;
use crate::errors::DepjobsError;
use crate::exec::SimulatedWorkload;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings and graph loading
/// - optional graph store / dry-run
/// - scheduler with the simulated workload
/// - single run or repeated cycles
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_settings(args.config.as_deref())?;
    let graph = load_graph(&args.graph)?;

    if let Some(ref path) = args.store {
        store_document(&graph, path)?;
    }

    if args.dry_run {
        print_dry_run(&graph, &cfg)?;
        return Ok(());
    }

    let workload = Arc::new(SimulatedWorkload::new(cfg.delay()?));
    let scheduler = Scheduler::with_workload(cfg.run_options()?, workload);

    // Ctrl-C → cancel the current run and stop cycling.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling");
            cancel.cancel();
        });
    }

    let graph = Arc::new(graph);
    let cycles = args.cycles.unwrap_or(cfg.cycle.count);

    if cycles == 1 {
        let mut scheduler = scheduler;
        let report = scheduler
            .run_until_cancelled(graph, cancel)
            .await
            .map_err(report_partial)?;
        print_sequence(&report.sequence);
        return Ok(());
    }

    let max_cycles = (cycles > 0).then_some(cycles);
    let mut runtime = CycleRuntime::new(scheduler, cfg.cycle_interval()?, max_cycles);
    let reports = runtime.run(graph, cancel).await.map_err(report_partial)?;

    for report in reports.iter() {
        println!("# run {}", report.run_id);
        print_sequence(&report.sequence);
    }
    Ok(())
}

/// Explicit `--config` must exist; the default path is optional.
fn resolve_settings(explicit: Option<&Path>) -> Result<RunnerConfig> {
    match explicit {
        Some(path) => Ok(load_settings(path)?),
        None => {
            let path = default_config_path();
            if path.is_file() {
                debug!(path = %path.display(), "using default settings file");
                Ok(load_settings(&path)?)
            } else {
                Ok(RunnerConfig::default())
            }
        }
    }
}

fn print_sequence(sequence: &[CallRecord]) {
    for record in sequence {
        println!("{record}");
    }
}

/// Print whatever completed before an aborted run, then pass the error on.
fn report_partial(err: DepjobsError) -> anyhow::Error {
    if let Some(partial) = err.partial_sequence() {
        warn!(completed = partial.len(), "run aborted; printing partial call sequence");
        print_sequence(partial);
    }
    err.into()
}

/// Simple dry-run output: jobs in topological order with their dependents.
fn print_dry_run(graph: &Graph, cfg: &RunnerConfig) -> Result<()> {
    let plan = RunPlan::prepare(graph, cfg.runner.strict_reachability)?;

    println!("depjobs dry-run");
    println!("  runner.max_concurrency = {:?}", cfg.runner.max_concurrency);
    println!("  runner.run_timeout = {:?}", cfg.runner.run_timeout);
    println!("  cycle.count = {}", cfg.cycle.count);
    println!();

    println!("jobs ({} reachable):", plan.reachable_count());
    for id in plan.order.iter() {
        let job = graph.lookup(id)?;
        println!("  - {id}");
        println!("      name: {}", job.name());
        println!("      upstream: {}", job.upstream_count());
        if !job.dependents().is_empty() {
            println!("      deps: {:?}", job.dependents());
        }
        if let Some(every) = graph.cadence_of(id) {
            println!("      every: {every}");
        }
    }

    if !plan.unreachable.is_empty() {
        println!();
        println!("unreachable from root: {:?}", plan.unreachable);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
