// src/exec/backend.rs

//! Pluggable job workload.
//!
//! The scheduler calls a [`Workload`] for the body of every job instead of
//! hard-coding the simulated delay. Production uses [`SimulatedWorkload`];
//! tests can provide their own implementation that, for example, records
//! which jobs ran or fails a chosen job.

use std::future::Future;
use std::pin::Pin;

use tracing::trace;

use crate::dag::Job;
use crate::exec::delay::{DelayProvider, RandomDelay};

/// Boxed future returned by [`Workload::run`].
pub type WorkloadFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Trait abstracting what "executing" a job means.
pub trait Workload: Send + Sync {
    /// Perform the job's work. An error fails the whole run.
    fn run<'a>(&'a self, job: &'a Job) -> WorkloadFuture<'a>;
}

/// Simulates work by sleeping for a provider-chosen duration.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWorkload<D = RandomDelay> {
    delay: D,
}

impl<D: DelayProvider> SimulatedWorkload<D> {
    pub fn new(delay: D) -> Self {
        Self { delay }
    }
}

impl<D: DelayProvider> Workload for SimulatedWorkload<D> {
    fn run<'a>(&'a self, job: &'a Job) -> WorkloadFuture<'a> {
        let delay = self.delay.next_delay(job.id());

        Box::pin(async move {
            trace!(job = %job.id(), ?delay, "simulating work");
            tokio::time::sleep(delay).await;
            Ok(())
        })
    }
}
