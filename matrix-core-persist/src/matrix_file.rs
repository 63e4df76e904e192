use crate::dataframe::rows_to_dataframe;
use crate::error::PersistError;
use chrono::{NaiveDate, Utc};
use matrix_core_domain::ChosenRow;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// File Manager (C13): the master matrix's two on-disk forms — a parquet
/// file for downstream analytics tooling, and a JSON twin that round-trips
/// [`ChosenRow`] exactly, which is what [`MatrixFileManager::load_existing`]
/// reads back. Both are written atomically (temp-then-rename).
#[derive(Debug, Clone)]
pub struct MatrixFileManager {
    dir: PathBuf,
}

impl MatrixFileManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(&self, specific_date: Option<NaiveDate>) -> String {
        match specific_date {
            Some(date) => format!("master_matrix_today_{}", date.format("%Y%m%d")),
            None => format!("master_matrix_{}", Utc::now().format("%Y%m%d_%H%M%S")),
        }
    }

    /// Persist `rows` as the new master matrix (§4.13).
    ///
    /// `specific_date` names the file after a single trading day (full
    /// rebuild scoped to one date); `None` falls back to a timestamp, for
    /// multi-day full rebuilds and rolling resequences.
    ///
    /// `on_saved` is the timetable build side effect (C12, §4.13 "call the
    /// timetable engine"). Its failure is logged and swallowed — a timetable
    /// build failure must never fail the matrix save.
    pub fn save(
        &self,
        rows: &[ChosenRow],
        specific_date: Option<NaiveDate>,
        on_saved: impl FnOnce(&[ChosenRow]) -> Result<(), Box<dyn std::error::Error>>,
    ) -> Result<PathBuf, PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let stem = self.stem(specific_date);
        let parquet_dest = self.dir.join(format!("{stem}.parquet"));
        let parquet_tmp = self.dir.join(format!("{stem}.parquet.tmp"));
        let json_dest = self.dir.join(format!("{stem}.json"));
        let json_tmp = self.dir.join(format!("{stem}.json.tmp"));

        let mut df = rows_to_dataframe(rows)?;
        let mut file = File::create(&parquet_tmp).map_err(|source| PersistError::Write {
            path: parquet_tmp.clone(),
            source,
        })?;
        ParquetWriter::new(&mut file)
            .finish(&mut df)
            .map_err(|source| PersistError::Parquet {
                path: parquet_tmp.clone(),
                source,
            })?;
        fs::rename(&parquet_tmp, &parquet_dest).map_err(|source| PersistError::Rename {
            tmp: parquet_tmp.clone(),
            dest: parquet_dest.clone(),
            source,
        })?;

        let body = serde_json::to_string(rows).map_err(|source| PersistError::Json {
            path: json_dest.clone(),
            source,
        })?;
        fs::write(&json_tmp, body).map_err(|source| PersistError::Write {
            path: json_tmp.clone(),
            source,
        })?;
        fs::rename(&json_tmp, &json_dest).map_err(|source| PersistError::Rename {
            tmp: json_tmp.clone(),
            dest: json_dest.clone(),
            source,
        })?;

        if let Err(err) = on_saved(rows) {
            tracing::warn!(%err, path = %parquet_dest.display(), "timetable build failed after matrix save; matrix save itself is unaffected");
        }

        Ok(parquet_dest)
    }

    /// Read back a previously saved master matrix from its JSON twin (§4.13).
    pub fn load_existing(&self, json_path: &Path) -> Result<Vec<ChosenRow>, PersistError> {
        let body = fs::read_to_string(json_path).map_err(|source| PersistError::Read {
            path: json_path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| PersistError::Json {
            path: json_path.to_path_buf(),
            source,
        })
    }

    /// Newest matrix file by reverse-lexicographic filename sort (§4.13):
    /// the `today_YYYYMMDD`/`YYYYMMDD_HHMMSS` stems this manager writes sort
    /// lexicographically in chronological order within each form, so a
    /// string sort is sufficient — no need to parse dates back out of
    /// filenames.
    pub fn get_latest_matrix_file(&self) -> Option<PathBuf> {
        let entries = fs::read_dir(&self.dir).ok()?;
        let mut jsons: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
            .collect();
        jsons.sort();
        jsons.pop()
    }
}
