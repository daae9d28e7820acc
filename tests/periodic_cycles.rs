// tests/periodic_cycles.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use depjobs::config::load_graph;
use depjobs::dag::{JobStatus, RunOptions, Scheduler};
use depjobs::engine::CycleRuntime;
use depjobs_test_utils::builders::GraphBuilder;
use depjobs_test_utils::fake_workload::RecordingWorkload;
use depjobs_test_utils::{init_tracing, with_timeout};
use tokio_util::sync::CancellationToken;

fn fast_scheduler() -> Scheduler {
    Scheduler::with_workload(
        RunOptions::default(),
        Arc::new(RecordingWorkload::new(Duration::from_millis(1))),
    )
}

#[tokio::test]
async fn periodic_job_runs_every_nth_cycle() {
    init_tracing();

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("graphs/periodic.yaml");
    let graph = Arc::new(load_graph(path).unwrap());

    let mut runtime = CycleRuntime::new(fast_scheduler(), Duration::from_millis(2), Some(6));
    let reports = with_timeout(runtime.run(Arc::clone(&graph), CancellationToken::new()))
        .await
        .unwrap();

    assert_eq!(reports.len(), 6);
    let cycles_with_rollup: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.record_of("hourly").is_some())
        .map(|(i, _)| i + 1)
        .collect();
    assert_eq!(cycles_with_rollup, vec![3, 6]);

    for report in reports.iter() {
        assert_eq!(report.ids()[0], "root");
        let rep = report.record_of("report").expect("report runs every cycle");
        if let Some(rollup) = report.record_of("hourly") {
            assert!(rollup.end < rep.start);
        } else {
            assert_eq!(report.skipped, vec!["hourly".to_string()]);
        }
    }

    // Run ids keep counting across cycles.
    let run_ids: Vec<u64> = reports.iter().map(|r| r.run_id).collect();
    assert_eq!(run_ids, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn suppressed_job_status_is_skipped() {
    init_tracing();

    let graph = GraphBuilder::new()
        .with_job("root", &["weekly"])
        .with_periodic_job("weekly", &[], 7)
        .build_shared();
    let mut scheduler = fast_scheduler();

    let report = with_timeout(scheduler.run(Arc::clone(&graph))).await.unwrap();

    assert_eq!(report.ids(), vec!["root"]);
    assert_eq!(graph.lookup("weekly").unwrap().status(), JobStatus::Skipped);
    assert_eq!(scheduler.periodic().ticks_of("weekly"), 1);
}

#[tokio::test]
async fn cadence_state_is_owned_per_scheduler() {
    init_tracing();

    let graph = GraphBuilder::new()
        .with_job("root", &["every2"])
        .with_periodic_job("every2", &[], 2)
        .build_shared();

    let mut first = fast_scheduler();
    let mut second = fast_scheduler();

    let r1 = with_timeout(first.run(Arc::clone(&graph))).await.unwrap();
    let r2 = with_timeout(first.run(Arc::clone(&graph))).await.unwrap();
    assert!(r1.record_of("every2").is_none());
    assert!(r2.record_of("every2").is_some());

    // A fresh scheduler starts its own count from zero.
    let r3 = with_timeout(second.run(Arc::clone(&graph))).await.unwrap();
    assert!(r3.record_of("every2").is_none());
}

#[tokio::test]
async fn runtime_stops_when_cancelled_mid_way() {
    init_tracing();

    let graph = GraphBuilder::new()
        .with_job("root", &["j2"])
        .with_job("j2", &[])
        .build_shared();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            cancel.cancel();
        });
    }

    let mut runtime = CycleRuntime::new(fast_scheduler(), Duration::from_millis(50), None);
    let result = with_timeout(runtime.run(graph, cancel)).await;

    // Cancellation lands either between cycles (clean stop) or during one.
    match result {
        Ok(reports) => assert!(!reports.is_empty() && reports.len() <= 4),
        Err(err) => assert!(err.partial_sequence().is_some(), "{err:?}"),
    }
    assert!(runtime.scheduler().runs_started() >= 1);
}
