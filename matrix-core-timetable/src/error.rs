use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimetableError {
    #[error(transparent)]
    Domain(#[from] matrix_core_domain::DomainError),

    #[error(transparent)]
    Io(#[from] matrix_core_io::IoError),

    #[error("failed to serialize timetable: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write timetable file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sweep stale timetable files in {dir}: {source}")]
    Sweep {
        dir: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
