use thiserror::Error;

/// Top-level error type returned by every `matrix-core` entry point.
///
/// Wraps each leaf crate's own `thiserror` enum with `#[from]` (§0 "Error
/// handling") so that orchestration code here propagates with `?` while
/// callers can still pattern-match on the underlying taxonomy described in
/// §7 (Tier-0 contract violation vs. missing-stream vs. I/O-transient).
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error(transparent)]
    Sequencer(#[from] matrix_core_sequencer::SequencerError),

    #[error(transparent)]
    Io(#[from] matrix_core_io::IoError),

    #[error(transparent)]
    Persist(#[from] matrix_core_persist::PersistError),

    #[error(transparent)]
    Timetable(#[from] matrix_core_timetable::TimetableError),

    #[error(transparent)]
    Domain(#[from] matrix_core_domain::DomainError),

    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}' as {format}: {source}")]
    ConfigParse {
        path: std::path::PathBuf,
        format: &'static str,
        source: String,
    },

    #[error("unrecognized config file extension for '{0}'; expected .toml or .json")]
    UnknownConfigFormat(std::path::PathBuf),

    #[error("invalid stream id '{0}' in configuration: {1}")]
    InvalidConfiguredStream(String, matrix_core_domain::DomainError),
}
