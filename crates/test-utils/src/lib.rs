//! Shared helpers for depjobs tests: tracing setup, timeouts, graph builders
//! and fake workloads.

pub mod builders;
pub mod fake_workload;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Upper bound for any single awaited run in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests, once per test binary.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `--nocapture`). The filter comes from `DEPJOBS_LOG`, defaulting
/// to `warn` to keep passing runs quiet.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("DEPJOBS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`]. A hung run
/// fails the test instead of stalling the suite.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}
