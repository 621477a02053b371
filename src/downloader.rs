//! Pipeline entry point: walk the timeline, then fetch what was queued.

use crate::completion::CompletionGate;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::ConcurrentFetcher;
use crate::ledger::HistoryLedger;
use crate::naming::FilenameTemplate;
use crate::queue::DocumentQueue;
use crate::timeline::{TimelineWalker, Transport, WalkOptions};
use crate::types::{Event, RunOutcome, RunReport};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Downloads every new document found on an account timeline
///
/// One `DocumentDownloader` owns the history ledger of its output directory.
/// Each call to [`run`](Self::run) performs one complete walk-then-fetch pass.
#[derive(Debug)]
pub struct DocumentDownloader {
    config: Arc<Config>,
    template: FilenameTemplate,
    ledger: Arc<HistoryLedger>,
    event_tx: broadcast::Sender<Event>,
}

impl DocumentDownloader {
    /// Validate `config`, create the output directory, and load the history ledger
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the output directory
    /// cannot be created, or the ledger cannot be loaded.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let template = FilenameTemplate::parse(&config.filename_format)?;

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.output_dir.display(),
                        e
                    ),
                ))
            })?;

        let ledger = Arc::new(HistoryLedger::load(config.history_path())?);

        // each subscriber gets every event; slow ones see RecvError::Lagged
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            template,
            ledger,
            event_tx,
        })
    }

    /// Subscribe to pipeline events
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use timeline_dl::{Config, DocumentDownloader, Event};
    ///
    /// # async fn example() -> timeline_dl::Result<()> {
    /// let downloader = DocumentDownloader::new(Config::default()).await?;
    /// let mut events = downloader.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         if let Event::DownloadFailed { path, error } = event {
    ///             eprintln!("{}: {error}", path.display());
    ///         }
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this downloader was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The history ledger shared by every run of this downloader
    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() only fails when nobody is subscribed
        self.event_tx.send(event).ok();
    }

    /// Walk the timeline over `transport` and fetch every newly found document
    ///
    /// The walk always runs to completion before any fetch starts. If it queues
    /// nothing, the run ends with [`RunOutcome::NothingToDownload`] and the ledger
    /// is left untouched. Otherwise every job is resolved before this returns;
    /// individual fetch failures are reported in the summary, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the event dumps cannot be
    /// written, or the HTTP client cannot be created.
    pub async fn run<T: Transport>(&self, transport: T) -> Result<RunReport> {
        self.emit_event(Event::HistoryLoaded {
            entries: self.ledger.len(),
        });

        let mut queue = DocumentQueue::new(
            &self.config.output_dir,
            self.template.clone(),
            Arc::clone(&self.ledger),
        );
        let mut walker = TimelineWalker::new(
            transport,
            WalkOptions {
                since_timestamp: self.config.since_timestamp,
                detail_batch_size: self.config.detail_batch_size,
            },
        );

        let walk = walker.walk(&mut queue, &self.event_tx).await?;
        if self.config.dump_events {
            walker.write_event_dumps(&self.config.output_dir).await?;
        }

        let queue_stats = queue.stats();
        self.emit_event(Event::WalkFinished {
            queued: queue_stats.queued,
            skipped: queue_stats.skipped(),
        });

        let jobs = queue.into_jobs();
        if jobs.is_empty() {
            tracing::info!(skipped = queue_stats.skipped(), "Nothing to download");
            self.emit_event(Event::NothingToDownload);
            return Ok(RunReport {
                walk,
                queue: queue_stats,
                outcome: RunOutcome::NothingToDownload,
            });
        }

        tracing::info!(
            count = jobs.len(),
            skipped = queue_stats.skipped(),
            "Waiting for downloads to complete"
        );

        let fetcher = ConcurrentFetcher::new(&self.config.fetch, Arc::clone(&self.ledger))?;
        let gate = CompletionGate::new(jobs.len());
        let summary = fetcher.fetch_all(jobs, &gate, &self.event_tx).await;

        if summary.failed.is_empty() {
            tracing::info!(downloaded = summary.succeeded.len(), "Done.");
        } else {
            tracing::warn!(
                downloaded = summary.succeeded.len(),
                failed = summary.failed.len(),
                "Done, some documents could not be downloaded and will be retried next run"
            );
        }

        Ok(RunReport {
            walk,
            queue: queue_stats,
            outcome: RunOutcome::Completed(summary),
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn new_creates_output_dir_and_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("documents");
        let config = Config {
            output_dir: output_dir.clone(),
            ..Config::default()
        };

        let downloader = DocumentDownloader::new(config).await.unwrap();

        assert!(output_dir.is_dir());
        assert!(output_dir.join("pytr_history").is_file());
        assert!(downloader.ledger().is_empty());
    }

    #[tokio::test]
    async fn new_rejects_invalid_template() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            output_dir: temp_dir.path().to_path_buf(),
            filename_format: "{iso_date} {nope}".to_string(),
            ..Config::default()
        };

        let result = DocumentDownloader::new(config).await;

        assert!(matches!(
            result,
            Err(Error::Config { key: Some(key), .. }) if key == "filename_format"
        ));
    }

    #[tokio::test]
    async fn new_loads_existing_history() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("pytr_history"),
            "https://x/a\nhttps://x/b\n",
        )
        .unwrap();
        let config = Config {
            output_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let downloader = DocumentDownloader::new(config).await.unwrap();

        assert_eq!(downloader.ledger().len(), 2);
    }
}
