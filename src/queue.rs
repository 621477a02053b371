//! Document queue: turns descriptors into fetch jobs, applying the dedup checks.
//!
//! Checks run in a fixed order and the first hit wins:
//!
//! 1. target path already seen this run ([`Decision::SkippedPathDuplicate`])
//! 2. target path already a file on disk ([`Decision::SkippedPathExists`])
//! 3. dedup key already seen this run ([`Decision::SkippedUrlDuplicate`])
//! 4. dedup key in the history ledger ([`Decision::SkippedUrlInHistory`])
//!
//! Path checks come first, so a document that already exists on disk is never
//! re-queued under a rotated URL token. The path is registered as seen before the
//! on-disk check; the key is registered only when a job is created.

use crate::ledger::HistoryLedger;
use crate::naming::{FilenameTemplate, derive_target_path};
use crate::types::{DedupKey, Decision, DocumentDescriptor, FetchJob, QueueStats};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Accumulates fetch jobs for one run
///
/// The queue owns its "seen" sets. It is mutated only from the single task that
/// drives the timeline walk, so it needs no locking.
#[derive(Debug)]
pub struct DocumentQueue {
    output_dir: PathBuf,
    template: FilenameTemplate,
    ledger: Arc<HistoryLedger>,
    seen_paths: HashSet<PathBuf>,
    seen_urls: HashSet<DedupKey>,
    jobs: Vec<FetchJob>,
    stats: QueueStats,
}

impl DocumentQueue {
    /// Create an empty queue writing below `output_dir`
    pub fn new(
        output_dir: impl Into<PathBuf>,
        template: FilenameTemplate,
        ledger: Arc<HistoryLedger>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            template,
            ledger,
            seen_paths: HashSet::new(),
            seen_urls: HashSet::new(),
            jobs: Vec::new(),
            stats: QueueStats::default(),
        }
    }

    /// Offer one document; returns what was decided
    pub fn enqueue(&mut self, descriptor: &DocumentDescriptor) -> Decision {
        self.enqueue_with_path(descriptor).0
    }

    /// Like [`enqueue`](Self::enqueue), also returning the derived target path
    pub fn enqueue_with_path(&mut self, descriptor: &DocumentDescriptor) -> (Decision, PathBuf) {
        let (decision, path) = self.decide(descriptor);
        self.stats.record(decision);

        if decision.is_queued() {
            tracing::debug!(path = %path.display(), "Added to queue");
        } else {
            tracing::debug!(
                path = %path.display(),
                url = %descriptor.dedup_key(),
                reason = decision.reason(),
                "Skipping document"
            );
        }

        (decision, path)
    }

    /// Target path a descriptor maps to (without registering anything)
    pub fn target_path(&self, descriptor: &DocumentDescriptor) -> PathBuf {
        derive_target_path(&self.output_dir, &self.template, descriptor)
    }

    fn decide(&mut self, descriptor: &DocumentDescriptor) -> (Decision, PathBuf) {
        let target_path = self.target_path(descriptor);

        if !self.seen_paths.insert(target_path.clone()) {
            return (Decision::SkippedPathDuplicate, target_path);
        }

        if target_path.is_file() {
            return (Decision::SkippedPathExists, target_path);
        }

        let dedup_key = descriptor.dedup_key();
        if self.seen_urls.contains(&dedup_key) {
            return (Decision::SkippedUrlDuplicate, target_path);
        }

        if self.ledger.contains(&dedup_key) {
            return (Decision::SkippedUrlInHistory, target_path);
        }

        self.seen_urls.insert(dedup_key.clone());
        self.jobs.push(FetchJob {
            target_path: target_path.clone(),
            fetch_url: descriptor.fetch_url.clone(),
            dedup_key,
        });

        (Decision::Queued, target_path)
    }

    /// Jobs queued so far, in queue order
    pub fn jobs(&self) -> &[FetchJob] {
        &self.jobs
    }

    /// Decision counters
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// Consume the queue, yielding its jobs
    pub fn into_jobs(self) -> Vec<FetchJob> {
        self.jobs
    }
}
