//! Cache of past goals and the candidates they retrieved.
//!
//! A hit lets a session skip goal interpretation and retrieval. The log is a
//! single JSON object on disk; a missing or unreadable file is an empty log.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::CandidateSet;

/// Candidates recorded for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub candidates: CandidateSet,
    pub created_at: DateTime<Utc>,
}

/// Goal text → recorded candidates.
#[derive(Debug, Default)]
pub struct QueryLog {
    path: Option<PathBuf>,
    entries: BTreeMap<String, QueryLogEntry>,
}

impl QueryLog {
    /// A log that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the log at `path`. Missing or corrupt files give an empty log
    /// that will overwrite the file on the next [`record`](Self::record).
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("query log {} is corrupt, starting empty: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("failed to read query log {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        tracing::debug!("query log loaded with {} entries", entries.len());
        Self {
            path: Some(path.to_path_buf()),
            entries,
        }
    }

    pub fn lookup(&self, goal: &str) -> Option<&QueryLogEntry> {
        self.entries.get(goal.trim())
    }

    /// Record `candidates` for `goal`, replacing any earlier entry, and write
    /// the log through if it is file-backed.
    pub fn record(&mut self, goal: &str, candidates: CandidateSet) -> std::io::Result<()> {
        self.entries.insert(
            goal.trim().to_string(),
            QueryLogEntry {
                candidates,
                created_at: Utc::now(),
            },
        );
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the log atomically: temp file in the same directory, then rename.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir
            }
            None => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.entries)?;
        tmp.flush()?;
        tmp.persist(path)?;
        Ok(())
    }
}
