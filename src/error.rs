//! Error types for timeline-dl
//!
//! This module provides the error hierarchy for the pipeline:
//! - [`Error`] is returned by fallible pipeline operations
//! - [`LedgerError`] covers loading and appending the history ledger
//! - [`FetchError`] covers a single document fetch (HTTP + disk write)
//!
//! Fetch errors are normally not propagated out of a run. They are collected per job
//! in [`FetchSummary`](crate::types::FetchSummary) so one bad document never aborts the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for timeline-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for timeline-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "filename_format")
        key: Option<String>,
    },

    /// History ledger could not be read or written
    #[error("history ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A single document fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The account transport failed (connection lost, subscription rejected, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// Filename template could not be parsed
    #[error("invalid filename template: {0}")]
    InvalidTemplate(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// History ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger file (or its parent directory) could not be read or created
    #[error("failed to load history ledger {path}: {source}")]
    Load {
        /// Path of the ledger file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A key could not be appended to the ledger file
    #[error("failed to append to history ledger {path}: {source}")]
    Append {
        /// Path of the ledger file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors for a single document fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    HttpStatus {
        /// The dedup key (query string stripped) of the requested URL
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The request could not be sent or the body could not be read
    #[error("request to {url} failed: {source}")]
    Request {
        /// The dedup key (query string stripped) of the requested URL
        url: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The target directory could not be created
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The response body could not be written to its target path
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
