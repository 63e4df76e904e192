use crate::error::IoError;
use fnv::FnvHashMap;
use matrix_core_domain::Stream;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::warn;
use walkdir::WalkDir;

type DiscoveryKey = (PathBuf, Option<SystemTime>);
type DiscoveryCache = RwLock<FnvHashMap<PathBuf, (Option<SystemTime>, Vec<Stream>)>>;

static DISCOVERY_CACHE: LazyLock<DiscoveryCache> = LazyLock::new(|| RwLock::new(FnvHashMap::default()));

/// Enumerate stream directories under `analyzer_runs_dir` (C2).
///
/// Cached by `(absolute_path, directory_mtime)` (§9 "Caches"); re-scans only
/// when the root directory's own mtime changes. A missing root directory is
/// not an error: it returns an empty list, logged as a warning, since a
/// partially-populated external analyzer job can legitimately not have
/// created the directory yet.
pub fn discover_streams(analyzer_runs_dir: &Path) -> Vec<Stream> {
    let mtime = std::fs::metadata(analyzer_runs_dir)
        .and_then(|meta| meta.modified())
        .ok();

    let key: DiscoveryKey = (analyzer_runs_dir.to_path_buf(), mtime);

    if let Some((cached_mtime, streams)) = DISCOVERY_CACHE.read().get(&key.0) {
        if *cached_mtime == key.1 {
            return streams.clone();
        }
    }

    let streams = scan(analyzer_runs_dir);
    DISCOVERY_CACHE
        .write()
        .insert(key.0, (key.1, streams.clone()));
    streams
}

fn scan(analyzer_runs_dir: &Path) -> Vec<Stream> {
    if !analyzer_runs_dir.is_dir() {
        warn!(path = %analyzer_runs_dir.display(), "analyzer_runs_dir missing; returning empty stream list");
        return Vec::new();
    }

    let mut streams: Vec<Stream> = WalkDir::new(analyzer_runs_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            match Stream::parse(&name) {
                Ok(stream) => Some(stream),
                Err(_) => {
                    warn!(name, "skipping directory not matching stream-id grammar");
                    None
                }
            }
        })
        .collect();

    streams.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    streams
}

/// Monthly analyzer files for `stream` under `analyzer_runs_dir`, matching
/// `<stream>/<YYYY>/<stream>_an_<YYYY>_<MM>.parquet` (§6.1). Sorted
/// ascending by year/month so the data loader can apply date filters
/// cheaply before even opening a file.
pub fn monthly_files(analyzer_runs_dir: &Path, stream: &Stream) -> Result<Vec<PathBuf>, IoError> {
    let stream_dir = analyzer_runs_dir.join(stream.as_str());
    if !stream_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(&stream_dir)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_returns_empty() {
        let streams = discover_streams(Path::new("/nonexistent/path/that/should/not/exist"));
        assert!(streams.is_empty());
    }
}
