//! History ledger: the append-only record of documents fetched in earlier runs.
//!
//! The ledger is a UTF-8 text file with one [`DedupKey`] per line and no header.
//! It is read fully at startup and appended to as fetches succeed. Appends from
//! concurrent fetch tasks are serialized through a single mutex-guarded handle,
//! and every append is flushed and synced before it returns, so the file never
//! holds a key for a document that is not on disk.

use crate::error::{LedgerError, Result};
use crate::types::DedupKey;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// In-memory view of the history ledger plus its single on-disk writer
#[derive(Debug)]
pub struct HistoryLedger {
    path: PathBuf,
    keys: RwLock<HashSet<DedupKey>>,
    writer: Mutex<Option<tokio::fs::File>>,
}

impl HistoryLedger {
    /// Load the ledger from `path`, creating it (and its parent directories) if missing
    ///
    /// Blank lines are ignored; line terminators (`\n` or `\r\n`) are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Load`] if the file or its directory cannot be read or created.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let load_err = |source| LedgerError::Load {
            path: path.clone(),
            source,
        };

        let keys: HashSet<DedupKey> = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(load_err)?;
            let keys: HashSet<DedupKey> = content
                .lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.is_empty())
                .map(DedupKey::from_canonical)
                .collect();
            tracing::info!(
                path = %path.display(),
                entries = keys.len(),
                "Found existing history file"
            );
            keys
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(load_err)?;
            }
            std::fs::File::create(&path).map_err(load_err)?;
            tracing::info!(path = %path.display(), "Created history file");
            HashSet::new()
        };

        Ok(Self {
            path,
            keys: RwLock::new(keys),
            writer: Mutex::new(None),
        })
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the key was fetched before (in an earlier run or earlier in this one)
    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    /// Number of distinct keys in the ledger
    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the ledger holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a key to the ledger file and the in-memory set
    ///
    /// The file is opened in append mode on first use and kept open for the rest
    /// of the fetch stage. The line is flushed and synced before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Append`] if the file cannot be opened or written.
    pub async fn append(&self, key: &DedupKey) -> Result<()> {
        let append_err = |source| LedgerError::Append {
            path: self.path.clone(),
            source,
        };

        let mut guard = self.writer.lock().await;
        let file = match guard.take() {
            Some(file) => file,
            None => tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(append_err)?,
        };
        let file = guard.insert(file);

        let line = format!("{key}\n");
        file.write_all(line.as_bytes()).await.map_err(append_err)?;
        file.flush().await.map_err(append_err)?;
        file.sync_data().await.map_err(append_err)?;

        self.keys
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone());

        Ok(())
    }
}
