//! Completion gate: counts resolved fetch jobs against the fixed total of a run.
//!
//! The total is known once the walk has finished and never changes afterwards.
//! Every job resolves exactly once, either as a success or a failure; the gate
//! opens when the number of resolved jobs reaches the total. A gate created with a
//! total of zero is open from the start.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Tracks resolved vs. total jobs and wakes waiters once all have resolved
#[derive(Debug)]
pub struct CompletionGate {
    total: usize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    notify: Notify,
}

impl CompletionGate {
    /// Create a gate for `total` jobs
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Record a job that ended with its file on disk and its key in the ledger
    ///
    /// Returns the number of resolved jobs including this one.
    pub fn record_success(&self) -> usize {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
        self.resolved()
    }

    /// Record a job that failed
    ///
    /// Returns the number of resolved jobs including this one.
    pub fn record_failure(&self) -> usize {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.resolved()
    }

    fn resolved(&self) -> usize {
        let completed = self.completed();
        if completed >= self.total {
            self.notify.notify_waiters();
        }
        completed
    }

    /// Total number of jobs this gate waits for
    pub fn total(&self) -> usize {
        self.total
    }

    /// Jobs resolved so far (success or failure)
    pub fn completed(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }

    /// Jobs that succeeded so far
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Jobs that failed so far
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Whether every job has resolved
    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total
    }

    /// Wait until every job has resolved
    ///
    /// There is no timeout: a job that never resolves keeps this pending.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before checking so a notification between the check and the
            // await is not lost
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }
}
