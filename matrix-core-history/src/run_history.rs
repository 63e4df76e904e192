use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Which operation produced a [`RunRecord`] (§3.1).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    FullRebuild,
    RollingResequence,
    PartialRebuild,
}

/// One append-only entry in `state/run_history.jsonl` (§3.1, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub mode: RunMode,
    pub timestamp: DateTime<Utc>,
    pub requested_days: Option<u32>,
    pub reprocess_start_date: Option<String>,
    pub merged_data_max_date: Option<String>,
    pub checkpoint_restore_id: Option<String>,
    pub rows_read: u64,
    pub rows_written: u64,
    pub duration_seconds: f64,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Error)]
pub enum RunHistoryError {
    #[error("failed to open run history file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to write run history record: {0}")]
    Write(#[from] io::Error),
}

/// Append-only JSON-Lines run-history log (C9). Reads tolerate malformed
/// lines (§6.4: "unreadable lines skipped"), logging a warning rather than
/// failing the whole read — a corrupted or truncated line must never make
/// forensic history unrecoverable.
#[derive(Debug, Clone)]
pub struct RunHistory {
    path: PathBuf,
}

impl RunHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record as a single JSON line.
    pub fn append(&self, record: &RunRecord) -> Result<(), RunHistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| RunHistoryError::Open {
                path: self.path.clone(),
                source,
            })?;

        let line = serde_json::to_string(record).map_err(io::Error::other)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read all parseable records, skipping malformed lines with a warning.
    pub fn read_all(&self) -> Result<Vec<RunRecord>, RunHistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|source| RunHistoryError::Open {
            path: self.path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(err) => {
                    warn!(lineno, %err, "skipping unreadable run_history line");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => warn!(lineno, %err, "skipping malformed run_history line"),
            }
        }
        Ok(records)
    }

    /// Most recent `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunRecord>, RunHistoryError> {
        let mut all = self.read_all()?;
        all.reverse();
        all.truncate(limit);
        Ok(all)
    }

    pub fn by_id(&self, run_id: &str) -> Result<Option<RunRecord>, RunHistoryError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|record| record.run_id == run_id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn sample_record(run_id: &str, success: bool) -> RunRecord {
        RunRecord {
            run_id: run_id.to_string(),
            mode: RunMode::FullRebuild,
            timestamp: Utc::now(),
            requested_days: None,
            reprocess_start_date: None,
            merged_data_max_date: None,
            checkpoint_restore_id: None,
            rows_read: 10,
            rows_written: 10,
            duration_seconds: 0.5,
            success,
            error_message: None,
        }
    }

    #[test]
    fn appends_and_reads_back() {
        let dir = tempdir("appends-and-reads-back");
        let history = RunHistory::new(dir.join("run_history.jsonl"));
        history.append(&sample_record("run-1", true)).unwrap();
        history.append(&sample_record("run-2", false)).unwrap();

        let all = history.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].run_id, "run-1");
    }

    #[test]
    fn tolerates_malformed_lines() {
        let dir = tempdir("tolerates-malformed-lines");
        let path = dir.join("run_history.jsonl");
        history_with_garbage(&path);

        let history = RunHistory::new(&path);
        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 1);
    }

    fn history_with_garbage(path: &std::path::Path) {
        let mut file = File::create(path).unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(
            file,
            "{}",
            serde_json::to_string(&sample_record("run-ok", true)).unwrap()
        )
        .unwrap();
    }

    fn tempdir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "matrix-core-history-test-{}-{}",
            std::process::id(),
            tag
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
