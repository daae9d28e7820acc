// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`backend`] provides the `Workload` trait the scheduler calls for the
//!   body of each job, and the default `SimulatedWorkload`.
//! - [`delay`] contains the providers for simulated work durations.

pub mod backend;
pub mod delay;

pub use backend::{SimulatedWorkload, Workload, WorkloadFuture};
pub use delay::{DelayProvider, FixedDelay, RandomDelay};
