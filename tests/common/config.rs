//! Test configuration helpers

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use timeline_dl::Config;

/// Output directory used by [`test_config`]
pub fn output_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("documents")
}

/// Config writing into a fresh temp directory, with event dumps enabled
pub fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        output_dir: output_dir(temp_dir),
        ..Config::default()
    }
}

/// Lines of the history ledger of `config` (empty if the file does not exist)
pub fn ledger_lines(config: &Config) -> Vec<String> {
    read_lines(&config.history_path())
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// All regular files below `dir`, relative to it, excluding the ledger and event dumps
pub fn document_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files);
    files.retain(|path| path.extension().is_some_and(|ext| ext == "pdf"));
    files.sort();
    files
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
}
