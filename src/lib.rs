//! # timeline-dl
//!
//! Incremental document downloader for brokerage account timelines.
//!
//! ## Design Philosophy
//!
//! timeline-dl is designed to be:
//! - **Incremental** - A history ledger and the files already on disk keep every
//!   document from being fetched twice, even when its signed URL changes
//! - **Crash-consistent** - A ledger line is written only after its file is fully
//!   on disk, so an interrupted run is simply picked up by the next one
//! - **Library-first** - The account transport is a trait; no CLI, no session handling
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Pipeline
//!
//! 1. [`HistoryLedger`] loads the keys of documents fetched in earlier runs
//! 2. [`TimelineWalker`](timeline::TimelineWalker) pages through the timeline over a
//!    [`Transport`] and requests the detail page of every document-bearing entry
//! 3. [`DocumentQueue`](queue::DocumentQueue) turns each document into a fetch job
//!    unless its path or its URL is already known
//! 4. [`ConcurrentFetcher`](fetcher::ConcurrentFetcher) downloads all jobs at once
//!    and appends each key to the ledger
//! 5. [`CompletionGate`](completion::CompletionGate) holds the run open until every
//!    job has resolved
//!
//! ## Quick Start
//!
//! ```no_run
//! use timeline_dl::{Config, DocumentDownloader, InboundFrame, RunOutcome, Transport};
//!
//! struct MySession;
//!
//! #[async_trait::async_trait]
//! impl Transport for MySession {
//!     async fn request_timeline(&mut self, after: Option<&str>) -> timeline_dl::Result<()> {
//!         todo!("subscribe to the next timeline page")
//!     }
//!     async fn request_timeline_detail(&mut self, id: &str) -> timeline_dl::Result<()> {
//!         todo!("subscribe to the detail page of `id`")
//!     }
//!     async fn receive(&mut self) -> timeline_dl::Result<InboundFrame> {
//!         todo!("wait for the next websocket message")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         output_dir: "./documents".into(),
//!         ..Default::default()
//!     };
//!     let downloader = DocumentDownloader::new(config).await?;
//!
//!     let report = downloader.run(MySession).await?;
//!     if let RunOutcome::Completed(summary) = report.outcome {
//!         println!("{} downloaded, {} failed", summary.succeeded.len(), summary.failed.len());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Completion gate for the fetch stage
pub mod completion;
/// Configuration types
pub mod config;
/// Pipeline entry point
pub mod downloader;
/// Error types
pub mod error;
/// Concurrent document fetching
pub mod fetcher;
/// History ledger of fetched documents
pub mod ledger;
/// Filename templates and target path derivation
pub mod naming;
/// Document queue with path and URL deduplication
pub mod queue;
/// Retry logic with exponential backoff
pub mod retry;
/// Timeline subscriptions and the walker
pub mod timeline;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FetchConfig, RetryConfig};
pub use downloader::DocumentDownloader;
pub use error::{Error, FetchError, LedgerError, Result};
pub use ledger::HistoryLedger;
pub use timeline::{InboundFrame, InboundMessage, SubscriptionId, Transport};
pub use types::{
    DedupKey, Decision, DocumentDescriptor, Event, FailedFetch, FetchJob, FetchSummary,
    QueueStats, RunOutcome, RunReport, WalkStats,
};
