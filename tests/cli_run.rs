// tests/cli_run.rs

use std::io::Write;
use std::path::PathBuf;

use depjobs::cli::CliArgs;
use depjobs::config::load_graph;
use depjobs::run;
use depjobs_test_utils::{init_tracing, with_timeout};
use tempfile::NamedTempFile;

fn graph_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("graphs")
        .join(name)
}

fn fast_settings(count: u32) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[delay]
min = "1ms"
max = "3ms"

[cycle]
interval = "5ms"
count = {count}
"#
    )
    .unwrap();
    file
}

fn args(graph: &str, config: &NamedTempFile) -> CliArgs {
    CliArgs {
        graph: graph_path(graph),
        config: Some(config.path().to_path_buf()),
        cycles: None,
        store: None,
        log_level: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn single_run_succeeds() {
    init_tracing();

    let settings = fast_settings(1);
    with_timeout(run(args("deep.yaml", &settings))).await.unwrap();
}

#[tokio::test]
async fn cycles_flag_overrides_settings() {
    init_tracing();

    let settings = fast_settings(1);
    let mut cli = args("periodic.yaml", &settings);
    cli.cycles = Some(3);
    with_timeout(run(cli)).await.unwrap();
}

#[tokio::test]
async fn dry_run_stores_without_executing() {
    init_tracing();

    let settings = fast_settings(1);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stored.json");

    let mut cli = args("diamond.yaml", &settings);
    cli.dry_run = true;
    cli.store = Some(out.clone());
    with_timeout(run(cli)).await.unwrap();

    let stored = load_graph(&out).unwrap();
    assert_eq!(stored.len(), 4);
}

#[tokio::test]
async fn missing_graph_fails() {
    init_tracing();

    let settings = fast_settings(1);
    let err = with_timeout(run(args("does-not-exist.yaml", &settings)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does-not-exist.yaml"), "{err}");
}
