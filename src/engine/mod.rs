// src/engine/mod.rs

//! Repeated scheduling for graphs with periodic jobs.
//!
//! A single run is driven by [`crate::dag::Scheduler`]; this module wraps it
//! in an interval loop ([`runtime::CycleRuntime`]) that re-invokes the whole
//! graph every cycle and stops on a cycle limit or cancellation.

pub mod runtime;

pub use runtime::CycleRuntime;
