use crate::error::PersistError;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use matrix_core_domain::{SequencerState, Stream};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A point-in-time snapshot of every stream's [`SequencerState`] (§3.1, §6.3):
/// `{checkpoint_id, checkpoint_date, created_at, streams}`. Never mutated
/// after creation; retained indefinitely (§3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: Uuid,
    pub checkpoint_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub streams: IndexMap<Stream, SequencerState>,
}

/// Metadata-only view of a checkpoint, as returned by [`CheckpointManager::list`].
#[derive(Debug, Clone)]
pub struct CheckpointMeta {
    pub checkpoint_id: Uuid,
    pub checkpoint_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

/// Checkpoint Manager (C8): atomic write/read of sequencer state snapshots
/// under `state/checkpoints/`.
///
/// Every write is temp-file-then-rename (§9 "Atomic writes"); an existing
/// checkpoint file is never overwritten in place, since a checkpoint is
/// immutable once created (§3.4).
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create and atomically persist a new checkpoint (§4.8). The id is
    /// generated fresh every call — checkpoints are content-addressed only
    /// by their random id, never by date, since more than one checkpoint can
    /// legitimately share a `checkpoint_date`.
    pub fn create(
        &self,
        checkpoint_date: NaiveDate,
        streams: IndexMap<Stream, SequencerState>,
    ) -> Result<Uuid, PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let checkpoint_id = Uuid::new_v4();
        let checkpoint = Checkpoint {
            checkpoint_id,
            checkpoint_date,
            created_at: Utc::now(),
            streams,
        };

        let dest = self.dir.join(format!("checkpoint_{checkpoint_id}.json"));
        let tmp = self.dir.join(format!("checkpoint_{checkpoint_id}.json.tmp"));

        let body = serde_json::to_string_pretty(&checkpoint).map_err(|source| PersistError::Json {
            path: dest.clone(),
            source,
        })?;
        fs::write(&tmp, body).map_err(|source| PersistError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &dest).map_err(|source| PersistError::Rename {
            tmp: tmp.clone(),
            dest: dest.clone(),
            source,
        })?;

        Ok(checkpoint_id)
    }

    fn all_checkpoints(&self) -> Vec<Checkpoint> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .filter_map(|entry| {
                let path = entry.path();
                match fs::read_to_string(&path) {
                    Ok(body) => match serde_json::from_str::<Checkpoint>(&body) {
                        Ok(checkpoint) => Some(checkpoint),
                        Err(err) => {
                            tracing::warn!(path = %path.display(), %err, "skipping unparseable checkpoint");
                            None
                        }
                    },
                    Err(err) => {
                        tracing::warn!(path = %path.display(), %err, "failed to read checkpoint file");
                        None
                    }
                }
            })
            .collect()
    }

    /// Newest checkpoint overall, by `checkpoint_date` (§4.8).
    pub fn load_latest(&self) -> Option<Checkpoint> {
        self.all_checkpoints()
            .into_iter()
            .max_by_key(|c| (c.checkpoint_date, c.created_at))
    }

    /// Newest checkpoint with `checkpoint_date` strictly before `before`.
    ///
    /// This is the Open Question O1 resolution (SPEC_FULL.md §9, DESIGN.md):
    /// the rolling resequence engine prefers this over [`load_latest`] so it
    /// restores state from strictly before the resequence window rather than
    /// from whatever is newest overall.
    pub fn load_latest_before(&self, before: NaiveDate) -> Option<Checkpoint> {
        self.all_checkpoints()
            .into_iter()
            .filter(|c| c.checkpoint_date < before)
            .max_by_key(|c| (c.checkpoint_date, c.created_at))
    }

    /// Summaries of every checkpoint on disk, sorted by date descending (§4.8).
    pub fn list(&self) -> Vec<CheckpointMeta> {
        let mut metas: Vec<CheckpointMeta> = self
            .all_checkpoints()
            .into_iter()
            .map(|c| CheckpointMeta {
                checkpoint_id: c.checkpoint_id,
                checkpoint_date: c.checkpoint_date,
                created_at: c.created_at,
                path: self.dir.join(format!("checkpoint_{}.json", c.checkpoint_id)),
            })
            .collect();
        metas.sort_by(|a, b| b.checkpoint_date.cmp(&a.checkpoint_date));
        metas
    }

    /// Shortcut for `loadLatest().checkpoint_date` (§4.8).
    pub fn max_processed_date(&self) -> Option<NaiveDate> {
        self.load_latest().map(|c| c.checkpoint_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_core_domain::Session;

    fn tempdir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "matrix-core-persist-test-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_streams() -> IndexMap<Stream, SequencerState> {
        let mut streams = IndexMap::new();
        streams.insert(
            Stream::parse("ES1").unwrap(),
            SequencerState::initial(
                Session::S1,
                &["07:30".into(), "08:00".into(), "09:00".into()],
            ),
        );
        streams
    }

    #[test]
    fn create_then_load_latest_round_trips() {
        let dir = tempdir("create-load");
        let manager = CheckpointManager::new(&dir);

        let date1 = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let date2 = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();

        manager.create(date1, sample_streams()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        manager.create(date2, sample_streams()).unwrap();

        let latest = manager.load_latest().unwrap();
        assert_eq!(latest.checkpoint_date, date2);
    }

    #[test]
    fn load_latest_before_excludes_window() {
        let dir = tempdir("before-window");
        let manager = CheckpointManager::new(&dir);

        let early = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        manager.create(early, sample_streams()).unwrap();
        manager.create(late, sample_streams()).unwrap();

        let window_start = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let restored = manager.load_latest_before(window_start).unwrap();
        assert_eq!(restored.checkpoint_date, early);
    }

    #[test]
    fn missing_dir_yields_none() {
        let manager = CheckpointManager::new("/nonexistent/checkpoints/dir");
        assert!(manager.load_latest().is_none());
        assert!(manager.list().is_empty());
    }
}
