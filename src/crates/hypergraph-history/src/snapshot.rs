//! Append-only, timestamped version history for one approach (`§4.1`'s
//! `history_list()`/`restore()` and `§6`'s `history/` directory).
//!
//! Every successful `Store::save` snapshots the file it is about to replace
//! into `history/<timestamp>.json` before the rename lands. History is a
//! flat, linear list ordered by filename (and therefore by capture time,
//! since timestamps are RFC3339-with-nanoseconds and filename-safe).

use crate::error::{HistoryError, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// One entry in an approach's history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Manages the `history/` subdirectory of one approach.
pub struct HistoryStore {
    dir: PathBuf,
    /// Oldest snapshots beyond this count are pruned after each `snapshot()`
    /// call. `None` disables pruning (unbounded history).
    retention_depth: Option<usize>,
}

impl HistoryStore {
    /// `approach_dir` is the approach's root directory; its `history/`
    /// subdirectory is created on demand.
    pub fn new(approach_dir: &Path) -> Self {
        Self {
            dir: approach_dir.join("history"),
            retention_depth: None,
        }
    }

    pub fn with_retention_depth(mut self, depth: usize) -> Self {
        self.retention_depth = Some(depth);
        self
    }

    /// Snapshot `bytes` (the outgoing `hypergraph.json` content) under a
    /// timestamp-derived filename, then prune if over retention depth.
    /// Returns the entry just written.
    pub fn snapshot(&self, bytes: &[u8], at: DateTime<Utc>) -> Result<HistoryEntry> {
        fs::create_dir_all(&self.dir)?;
        let timestamp = hg_types::filename_safe_timestamp(at);
        let path = self.dir.join(format!("{timestamp}.json"));
        fs::write(&path, bytes)?;
        let entry = HistoryEntry {
            timestamp,
            size_bytes: bytes.len() as u64,
            path,
        };
        if let Some(depth) = self.retention_depth {
            self.prune(depth)?;
        }
        Ok(entry)
    }

    /// All history entries, oldest first.
    pub fn list(&self) -> Result<Vec<HistoryEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(timestamp) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let size_bytes = dir_entry.metadata()?.len();
            entries.push(HistoryEntry {
                timestamp: timestamp.to_string(),
                path,
                size_bytes,
            });
        }
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    /// Read the raw bytes of the snapshot captured at `timestamp`.
    pub fn restore(&self, timestamp: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(format!("{timestamp}.json"));
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HistoryError::NotFound(timestamp.to_string())
            } else {
                HistoryError::Io(e)
            }
        })
    }

    fn prune(&self, depth: usize) -> Result<()> {
        let entries = self.list()?;
        if entries.len() <= depth {
            return Ok(());
        }
        for stale in &entries[..entries.len() - depth] {
            let _ = fs::remove_file(&stale.path);
        }
        Ok(())
    }
}
