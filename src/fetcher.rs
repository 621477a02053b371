//! Concurrent fetch stage: downloads queued documents and records them in the ledger.
//!
//! Every job runs as its own tokio task against one shared HTTP client. A job
//! succeeds only if the server answers with a 2xx status, the body is written to
//! `<target>.part` and renamed onto the target, and the dedup key is appended to
//! the ledger, in that order. A job that fails at any step leaves no ledger line,
//! so the next run picks it up again.
//!
//! Failures are per job: they are logged, emitted as [`Event::DownloadFailed`] and
//! collected in [`FetchSummary::failed`], and never abort the rest of the batch.

use crate::completion::CompletionGate;
use crate::config::{FetchConfig, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::ledger::HistoryLedger;
use crate::retry::fetch_with_retry;
use crate::types::{Event, FailedFetch, FetchJob, FetchSummary};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, broadcast};

/// Suffix of the temporary file a body is written to before it is renamed into place
const PART_SUFFIX: &str = ".part";

/// Drains a job list with one task per job
#[derive(Debug)]
pub struct ConcurrentFetcher {
    client: reqwest::Client,
    retry: Option<RetryConfig>,
    limit: Option<Arc<Semaphore>>,
    ledger: Arc<HistoryLedger>,
}

impl ConcurrentFetcher {
    /// Build a fetcher with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &FetchConfig, ledger: Arc<HistoryLedger>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            limit: config
                .max_concurrent
                .map(|permits| Arc::new(Semaphore::new(permits))),
            ledger,
        })
    }

    /// Fetch every job, resolving each one exactly once through `gate`
    ///
    /// `gate` must have been created for `jobs.len()` jobs. Returns once the gate
    /// reports every job resolved.
    pub async fn fetch_all(
        &self,
        jobs: Vec<FetchJob>,
        gate: &CompletionGate,
        events: &broadcast::Sender<Event>,
    ) -> FetchSummary {
        let total = jobs.len();
        let mut summary = FetchSummary {
            total,
            ..FetchSummary::default()
        };

        let mut running: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| {
                let handle = tokio::spawn(fetch_one(
                    self.client.clone(),
                    self.retry.clone(),
                    self.limit.clone(),
                    Arc::clone(&self.ledger),
                    job.clone(),
                ));
                async move { (job, handle.await) }
            })
            .collect();

        while let Some((job, joined)) = running.next().await {
            let result = joined
                .map_err(|e| Error::Other(format!("fetch task failed: {e}")))
                .and_then(|r| r);

            match result {
                Ok(()) => {
                    let completed = gate.record_success();
                    tracing::debug!("{completed:>3}/{total} {}", display_name(&job.target_path));
                    events
                        .send(Event::DownloadComplete {
                            path: job.target_path.clone(),
                            completed,
                            total,
                        })
                        .ok();
                    summary.succeeded.push(job.target_path);
                }
                Err(e) => {
                    gate.record_failure();
                    tracing::warn!(
                        path = %job.target_path.display(),
                        url = %job.dedup_key,
                        error = %e,
                        "Document fetch failed"
                    );
                    events
                        .send(Event::DownloadFailed {
                            path: job.target_path.clone(),
                            error: e.to_string(),
                        })
                        .ok();
                    summary.failed.push(FailedFetch {
                        target_path: job.target_path,
                        dedup_key: job.dedup_key,
                        error: e.to_string(),
                    });
                }
            }
        }

        gate.wait().await;
        events
            .send(Event::AllDownloadsComplete {
                succeeded: summary.succeeded.len(),
                failed: summary.failed.len(),
            })
            .ok();

        summary
    }
}

async fn fetch_one(
    client: reqwest::Client,
    retry: Option<RetryConfig>,
    limit: Option<Arc<Semaphore>>,
    ledger: Arc<HistoryLedger>,
    job: FetchJob,
) -> Result<()> {
    // the semaphore is never closed, so acquiring only fails if it is dropped
    let _permit = match limit {
        Some(semaphore) => semaphore.acquire_owned().await.ok(),
        None => None,
    };

    let body = match &retry {
        Some(retry) => fetch_with_retry(retry, || download(&client, &job)).await?,
        None => download(&client, &job).await?,
    };

    persist(&job.target_path, &body).await?;
    ledger.append(&job.dedup_key).await
}

/// GET the document, insisting on a success status
async fn download(
    client: &reqwest::Client,
    job: &FetchJob,
) -> std::result::Result<Vec<u8>, FetchError> {
    let request_err = |source| FetchError::Request {
        url: job.dedup_key.to_string(),
        source,
    };

    let response = client
        .get(&job.fetch_url)
        .send()
        .await
        .map_err(request_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: job.dedup_key.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(request_err)?;
    Ok(body.to_vec())
}

/// Write `body` next to `target` and rename it into place
async fn persist(target: &Path, body: &[u8]) -> std::result::Result<(), FetchError> {
    if target.is_file() {
        tracing::debug!(path = %target.display(), "File already exists, overwriting");
    }

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| FetchError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let part = part_path(target);
    let write_err = |source| FetchError::Write {
        path: target.to_path_buf(),
        source,
    };

    if let Err(e) = write_synced(&part, body).await {
        tokio::fs::remove_file(&part).await.ok();
        return Err(write_err(e));
    }

    if let Err(e) = tokio::fs::rename(&part, target).await {
        tokio::fs::remove_file(&part).await.ok();
        return Err(write_err(e));
    }

    Ok(())
}

async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

/// `<target>.part`
fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(PART_SUFFIX);
    target.with_file_name(name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
