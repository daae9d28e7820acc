use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use depjobs::dag::Job;
use depjobs::exec::{Workload, WorkloadFuture};

/// A fake workload that:
/// - records which jobs were "run", in start order
/// - sleeps for a fixed short duration per job.
#[derive(Debug, Clone)]
pub struct RecordingWorkload {
    delay: Duration,
    started: Arc<Mutex<Vec<String>>>,
}

impl RecordingWorkload {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Jobs started so far.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl Default for RecordingWorkload {
    fn default() -> Self {
        Self::new(Duration::from_millis(2))
    }
}

impl Workload for RecordingWorkload {
    fn run<'a>(&'a self, job: &'a Job) -> WorkloadFuture<'a> {
        Box::pin(async move {
            self.started.lock().unwrap().push(job.id().to_string());
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
    }
}

/// Fails the named jobs; every other job completes after `delay`, or after
/// its own delay if one was set with [`FailingWorkload::with_slow_job`].
#[derive(Debug, Clone)]
pub struct FailingWorkload {
    failing: HashSet<String>,
    delay: Duration,
    slow: HashMap<String, Duration>,
}

impl FailingWorkload {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            delay: Duration::from_millis(2),
            slow: HashMap::new(),
        }
    }

    pub fn with_slow_job(mut self, id: &str, delay: Duration) -> Self {
        self.slow.insert(id.to_string(), delay);
        self
    }
}

impl Workload for FailingWorkload {
    fn run<'a>(&'a self, job: &'a Job) -> WorkloadFuture<'a> {
        Box::pin(async move {
            let delay = self.slow.get(job.id()).copied().unwrap_or(self.delay);
            tokio::time::sleep(delay).await;
            if self.failing.contains(job.id()) {
                return Err(anyhow!("job {} exploded", job.id()));
            }
            Ok(())
        })
    }
}

/// Completes jobs quickly, except the named one which takes `stall`.
#[derive(Debug, Clone)]
pub struct StallingWorkload {
    stalled: String,
    stall: Duration,
}

impl StallingWorkload {
    pub fn new(stalled: &str, stall: Duration) -> Self {
        Self {
            stalled: stalled.to_string(),
            stall,
        }
    }
}

impl Workload for StallingWorkload {
    fn run<'a>(&'a self, job: &'a Job) -> WorkloadFuture<'a> {
        Box::pin(async move {
            let delay = if job.id() == self.stalled {
                self.stall
            } else {
                Duration::from_millis(1)
            };
            tokio::time::sleep(delay).await;
            Ok(())
        })
    }
}

/// Tracks how many jobs run at the same time.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGauge {
    current: Arc<Mutex<usize>>,
    peak: Arc<Mutex<usize>>,
}

impl ConcurrencyGauge {
    pub fn peak(&self) -> usize {
        *self.peak.lock().unwrap()
    }
}

impl Workload for ConcurrencyGauge {
    fn run<'a>(&'a self, _job: &'a Job) -> WorkloadFuture<'a> {
        Box::pin(async move {
            {
                let mut current = self.current.lock().unwrap();
                *current += 1;
                let mut peak = self.peak.lock().unwrap();
                *peak = (*peak).max(*current);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            *self.current.lock().unwrap() -= 1;
            Ok(())
        })
    }
}
