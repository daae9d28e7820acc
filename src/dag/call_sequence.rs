// src/dag/call_sequence.rs

//! Ordered log of job completions for a single run.
//!
//! Many producers (one per executing job) push [`CallRecord`]s into a bounded
//! channel; the scheduler owns the single [`CallSequenceDrain`] and drains it
//! once every producer has finished. `drain` consumes the drain handle and
//! closes the channel before reading, so reading an open log or closing it
//! twice cannot be expressed.
//!
//! The recorder also owns the run's logical clock. A completion takes its end
//! tick and enters the channel under one lock, so the drained order always
//! agrees with the end ticks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::types::JobId;

/// One completion record.
///
/// `start` and `end` are ticks of the run's logical clock: strictly
/// increasing integers shared by all jobs of the run, so `end(u) < start(v)`
/// holds exactly when `u` finished before `v` started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub id: JobId,
    pub start: u64,
    pub end: u64,
    /// Wall-clock time spent in the job's workload.
    pub elapsed: Duration,
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:.3}ms",
            self.id,
            self.start,
            self.end,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

/// Create a recorder/drain pair with room for `capacity` records.
pub fn channel(capacity: usize) -> (CallRecorder, CallSequenceDrain) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let recorder = CallRecorder {
        tx,
        clock: Arc::new(AtomicU64::new(0)),
        order: Arc::new(Mutex::new(())),
    };
    (recorder, CallSequenceDrain { rx })
}

/// Producer side; cheap to clone into every job task.
#[derive(Debug, Clone)]
pub struct CallRecorder {
    tx: mpsc::Sender<CallRecord>,
    clock: Arc<AtomicU64>,
    order: Arc<Mutex<()>>,
}

impl CallRecorder {
    /// Next tick of the run's logical clock.
    pub fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Stamp the end tick of a completion and append its record as one step.
    /// Returns the end tick.
    pub fn complete(&self, id: &str, start: u64, elapsed: Duration) -> u64 {
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        let end = self.tick();
        self.record(CallRecord {
            id: id.to_string(),
            start,
            end,
            elapsed,
        });
        end
    }

    /// Append a record without suspending.
    ///
    /// Capacity equals the number of jobs that can execute in the run, so the
    /// channel is never full in practice. Records arriving after the drain
    /// closed the log are dropped.
    pub fn record(&self, record: CallRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Closed(rec)) => {
                debug!(job = %rec.id, "call sequence already closed; dropping late record");
            }
            Err(TrySendError::Full(rec)) => {
                warn!(job = %rec.id, "call sequence full; dropping record");
            }
        }
    }
}

/// Consumer side, owned by the scheduler.
#[derive(Debug)]
pub struct CallSequenceDrain {
    rx: mpsc::Receiver<CallRecord>,
}

impl CallSequenceDrain {
    /// Close the log and return every record in completion order.
    pub fn drain(mut self) -> Vec<CallRecord> {
        self.rx.close();
        let mut records = Vec::with_capacity(self.rx.len());
        while let Ok(record) = self.rx.try_recv() {
            records.push(record);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, start: u64, end: u64) -> CallRecord {
        CallRecord {
            id: id.to_string(),
            start,
            end,
            elapsed: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn drains_in_arrival_order_across_producers() {
        let (recorder, drain) = channel(3);

        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            let r = recorder.clone();
            let i = i as u64;
            // Await each producer so the arrival order is known.
            tokio::spawn(async move { r.record(rec(id, i * 2, i * 2 + 1)) })
                .await
                .unwrap();
        }

        let records = drain.drain();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn records_after_drain_are_dropped() {
        let (recorder, drain) = channel(2);
        recorder.record(rec("root", 0, 1));
        let records = drain.drain();
        assert_eq!(records.len(), 1);

        // Receiver is gone; this must not panic or block.
        recorder.record(rec("late", 2, 3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_completions_drain_in_end_tick_order() {
        let producers = 256;
        let (recorder, drain) = channel(producers);

        let mut handles = Vec::new();
        for i in 0..producers {
            let r = recorder.clone();
            handles.push(tokio::spawn(async move {
                let start = r.tick();
                tokio::task::yield_now().await;
                r.complete(&format!("j{i}"), start, Duration::ZERO)
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = drain.drain();
        assert_eq!(records.len(), producers);
        assert!(
            records.windows(2).all(|w| w[0].end < w[1].end),
            "end ticks out of order: {records:?}"
        );
        assert!(records.iter().all(|r| r.start < r.end));
    }

    #[test]
    fn display_is_one_line_per_record() {
        let line = rec("j2", 4, 9).to_string();
        assert!(line.starts_with("j2 4 9 "));
    }
}
