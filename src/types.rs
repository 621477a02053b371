//! Core types for timeline-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Canonical identity of a document: its fetch URL with the query string removed
///
/// Fetch URLs are usually signed and single-use, so two URLs that differ only in
/// their query token point at the same document. All dedup decisions compare
/// `DedupKey`s, never raw URLs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    /// Derive the key from a fetch URL (everything from the first `?` is dropped)
    pub fn from_url(url: &str) -> Self {
        let base = url.split_once('?').map_or(url, |(base, _)| base);
        Self(base.to_string())
    }

    /// Wrap a key that is already in canonical form (e.g. a ledger line)
    pub fn from_canonical(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One document found on a timeline detail page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Absolute URL, possibly carrying an expiring query token
    pub fetch_url: String,
    /// Document label, e.g. "Kontoauszug" or "Kosteninformation 2"
    pub display_title: String,
    /// Dotted calendar date, e.g. "01.02.2023"
    pub detail_date: String,
    /// Title of the timeline detail the document belongs to
    pub title_text: String,
    /// Subtitle of the timeline detail (may contain "um HH:MM Uhr")
    pub subtitle_text: String,
    /// Optional grouping folder below the output root
    pub subfolder: Option<String>,
}

impl DocumentDescriptor {
    /// Dedup key of this document's URL
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::from_url(&self.fetch_url)
    }
}

/// A queued download: where it goes, where it comes from, and how it is remembered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchJob {
    /// Sanitized destination path
    pub target_path: PathBuf,
    /// URL to request (with its query token intact)
    pub fetch_url: String,
    /// Key appended to the history ledger once the file is on disk
    pub dedup_key: DedupKey,
}

/// Outcome of offering one document to the queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// A fetch job was created
    Queued,
    /// Another document of this run already maps to the same target path
    SkippedPathDuplicate,
    /// The target path already exists on disk
    SkippedPathExists,
    /// Another document of this run already has the same dedup key
    SkippedUrlDuplicate,
    /// The dedup key is recorded in the history ledger
    SkippedUrlInHistory,
}

impl Decision {
    /// Whether a job was created
    pub fn is_queued(&self) -> bool {
        matches!(self, Decision::Queued)
    }

    /// Short human-readable reason, used in log lines
    pub fn reason(&self) -> &'static str {
        match self {
            Decision::Queued => "queued",
            Decision::SkippedPathDuplicate => "file already in queue",
            Decision::SkippedPathExists => "file already exists",
            Decision::SkippedUrlDuplicate => "URL already in queue",
            Decision::SkippedUrlInHistory => "URL already in history",
        }
    }
}

/// Counters for every [`Decision`] the queue made during a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Documents turned into fetch jobs
    pub queued: usize,
    /// Skipped: target path already seen this run
    pub path_duplicates: usize,
    /// Skipped: target path already on disk
    pub path_exists: usize,
    /// Skipped: dedup key already seen this run
    pub url_duplicates: usize,
    /// Skipped: dedup key found in the history ledger
    pub url_in_history: usize,
}

impl QueueStats {
    /// Count one decision
    pub fn record(&mut self, decision: Decision) {
        let counter = match decision {
            Decision::Queued => &mut self.queued,
            Decision::SkippedPathDuplicate => &mut self.path_duplicates,
            Decision::SkippedPathExists => &mut self.path_exists,
            Decision::SkippedUrlDuplicate => &mut self.url_duplicates,
            Decision::SkippedUrlInHistory => &mut self.url_in_history,
        };
        *counter += 1;
    }

    /// Total number of skipped documents
    pub fn skipped(&self) -> usize {
        self.path_duplicates + self.path_exists + self.url_duplicates + self.url_in_history
    }
}

/// Counters describing one timeline walk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Timeline pages received
    pub timelines: usize,
    /// Timeline entries received across all pages
    pub timeline_events: usize,
    /// Detail subscriptions issued
    pub details_requested: usize,
    /// Detail responses received (including malformed ones)
    pub details_received: usize,
    /// Documents forwarded to the queue
    pub documents: usize,
    /// Inbound messages that were ignored (unhandled type or malformed payload)
    pub ignored_messages: usize,
}

/// A fetch job that did not end with a file on disk and a ledger line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFetch {
    /// Target path of the failed job
    pub target_path: PathBuf,
    /// Dedup key of the failed job
    pub dedup_key: DedupKey,
    /// Error message
    pub error: String,
}

/// Result of the concurrent fetch stage
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    /// Number of jobs handed to the fetcher
    pub total: usize,
    /// Paths written and recorded in the ledger
    pub succeeded: Vec<PathBuf>,
    /// Jobs that failed (left out of the ledger so the next run retries them)
    pub failed: Vec<FailedFetch>,
}

impl FetchSummary {
    /// Whether every job succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.succeeded.len() == self.total
    }
}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The walk produced no fetch jobs; the ledger was not touched
    NothingToDownload,
    /// Every queued job resolved (individual failures are listed in the summary)
    Completed(FetchSummary),
}

/// Structured result of [`DocumentDownloader::run`](crate::DocumentDownloader::run)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Timeline walk counters
    pub walk: WalkStats,
    /// Queue decision counters
    pub queue: QueueStats,
    /// Fetch stage outcome
    pub outcome: RunOutcome,
}

/// Event emitted by the downloader
///
/// Subscribe with [`DocumentDownloader::subscribe`](crate::DocumentDownloader::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// History ledger loaded at startup
    HistoryLoaded {
        /// Number of keys in the ledger
        entries: usize,
    },

    /// A timeline page was received
    TimelineReceived {
        /// 1-based page number
        page: usize,
        /// Number of entries on the page
        entries: usize,
    },

    /// A document was turned into a fetch job
    DocumentQueued {
        /// Target path
        path: PathBuf,
    },

    /// A document was skipped by the dedup checks
    DocumentSkipped {
        /// Target path
        path: PathBuf,
        /// Why it was skipped
        decision: Decision,
    },

    /// The timeline walk finished
    WalkFinished {
        /// Number of fetch jobs created
        queued: usize,
        /// Number of documents skipped
        skipped: usize,
    },

    /// The walk produced no fetch jobs
    NothingToDownload,

    /// A document was written and recorded in the ledger
    DownloadComplete {
        /// Target path
        path: PathBuf,
        /// Jobs resolved so far (success or failure)
        completed: usize,
        /// Total number of jobs
        total: usize,
    },

    /// A document fetch failed
    DownloadFailed {
        /// Target path
        path: PathBuf,
        /// Error message
        error: String,
    },

    /// Every queued job resolved
    AllDownloadsComplete {
        /// Successful jobs
        succeeded: usize,
        /// Failed jobs
        failed: usize,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_strips_query_string() {
        assert_eq!(
            DedupKey::from_url("https://x/doc?token=A").as_str(),
            "https://x/doc"
        );
        assert_eq!(
            DedupKey::from_url("https://x/doc?token=A"),
            DedupKey::from_url("https://x/doc?token=B")
        );
    }

    #[test]
    fn dedup_key_without_query_is_unchanged() {
        assert_eq!(DedupKey::from_url("https://x/doc").as_str(), "https://x/doc");
        assert_eq!(DedupKey::from_url("https://x/doc?").as_str(), "https://x/doc");
    }

    #[test]
    fn queue_stats_counts_each_decision() {
        let mut stats = QueueStats::default();
        for decision in [
            Decision::Queued,
            Decision::Queued,
            Decision::SkippedPathDuplicate,
            Decision::SkippedPathExists,
            Decision::SkippedUrlDuplicate,
            Decision::SkippedUrlInHistory,
        ] {
            stats.record(decision);
        }

        assert_eq!(stats.queued, 2);
        assert_eq!(stats.skipped(), 4);
    }

    #[test]
    fn run_outcome_serializes_with_tag() {
        let json = serde_json::to_value(RunOutcome::NothingToDownload).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "nothing_to_download" }));
    }

    #[test]
    fn fetch_summary_all_succeeded() {
        let mut summary = FetchSummary {
            total: 1,
            succeeded: vec![PathBuf::from("/out/a.pdf")],
            failed: vec![],
        };
        assert!(summary.all_succeeded());

        summary.total = 2;
        summary.failed.push(FailedFetch {
            target_path: PathBuf::from("/out/b.pdf"),
            dedup_key: DedupKey::from_url("https://x/b"),
            error: "https://x/b returned HTTP 500".to_string(),
        });
        assert!(!summary.all_succeeded());
    }
}
