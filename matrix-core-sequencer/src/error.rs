use matrix_core_domain::DomainError;
use thiserror::Error;

/// Errors raised while running the sequencer's daily loop, the Master
/// Matrix orchestrator (C10), or the rolling resequence engine (C11).
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Io(#[from] matrix_core_io::IoError),

    #[error(transparent)]
    Persist(#[from] matrix_core_persist::PersistError),

    #[error("no analyzer data available across any discovered stream")]
    EmptyAnalyzerData,

    #[error(
        "insufficient trading-day history to resequence {requested} days back; only \
         {available} unique trading day(s) available"
    )]
    InsufficientHistory { requested: u32, available: usize },

    #[error("rolling resequence requires a prior checkpoint; run a full rebuild first")]
    CheckpointRequired,
}
