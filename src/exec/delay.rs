// src/exec/delay.rs

//! Providers for the simulated work duration of a job.

use std::fmt::Debug;
use std::time::Duration;

use rand::Rng;

/// Source of simulated execution times.
pub trait DelayProvider: Send + Sync + Debug {
    fn next_delay(&self, job: &str) -> Duration;
}

/// Uniformly distributed delay in `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for RandomDelay {
    /// 0.5ms to 2000.5ms.
    fn default() -> Self {
        Self::new(Duration::from_micros(500), Duration::from_micros(2_000_500))
    }
}

impl DelayProvider for RandomDelay {
    fn next_delay(&self, _job: &str) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Same delay for every job; handy for deterministic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedDelay(pub Duration);

impl DelayProvider for FixedDelay {
    fn next_delay(&self, _job: &str) -> Duration {
        self.0
    }
}
