//! Configuration types for timeline-dl

use crate::error::{Error, Result};
use crate::naming::FilenameTemplate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP fetch behavior for the concurrent fetch stage
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Maximum concurrent fetches (None = unbounded, one task per queued document)
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Retry transient fetch failures (None = a failed fetch is left for the next run)
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// User-Agent header sent with every fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            max_concurrent: None,
            retry: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for [`DocumentDownloader`](crate::DocumentDownloader)
///
/// Every field has a default, so `Config::default()` (or `{}` as JSON) is a
/// working configuration that downloads everything into `./documents`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for downloaded documents (default: "./documents")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// History ledger file name, relative to `output_dir` (default: "pytr_history")
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Filename template (default: "{iso_date}{time} {title}{doc_num}")
    ///
    /// Placeholders: `{iso_date}`, `{time}`, `{title}`, `{subtitle}`, `{doc_num}`.
    /// Use `{{` and `}}` for literal braces.
    #[serde(default = "default_filename_format")]
    pub filename_format: String,

    /// Floor timestamp in epoch milliseconds (None = walk the whole timeline)
    #[serde(default)]
    pub since_timestamp: Option<i64>,

    /// Maximum number of outstanding timeline detail subscriptions (default: 5)
    #[serde(default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    /// Write `events_with_documents.json` and `other_events.json` after the walk (default: true)
    #[serde(default = "default_true")]
    pub dump_events: bool,

    /// HTTP fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            history_file: default_history_file(),
            filename_format: default_filename_format(),
            since_timestamp: None,
            detail_batch_size: default_detail_batch_size(),
            dump_events: true,
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Full path of the history ledger file
    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join(&self.history_file)
    }

    /// Check settings that cannot be expressed through types alone
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        FilenameTemplate::parse(&self.filename_format)
            .map_err(|e| Error::config("filename_format", e.to_string()))?;

        if self.detail_batch_size == 0 {
            return Err(Error::config(
                "detail_batch_size",
                "detail_batch_size must be greater than zero",
            ));
        }

        if self.fetch.max_concurrent == Some(0) {
            return Err(Error::config(
                "fetch.max_concurrent",
                "max_concurrent must be greater than zero (omit it for no limit)",
            ));
        }

        if self.history_file.as_os_str().is_empty() {
            return Err(Error::config("history_file", "history_file must not be empty"));
        }

        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./documents")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("pytr_history")
}

fn default_filename_format() -> String {
    "{iso_date}{time} {title}{doc_num}".to_string()
}

fn default_detail_batch_size() -> usize {
    5
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    concat!("timeline-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
