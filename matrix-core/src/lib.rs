#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # Matrix Core
//!
//! The facade crate: wires together stream discovery and data loading
//! (`matrix-core-io`), the filter engine (`matrix-core-filter`), rolling
//! history and run history (`matrix-core-history`), the trade selector
//! (`matrix-core-selector`), the per-stream sequencer, Master Matrix
//! orchestrator and rolling resequence engine (`matrix-core-sequencer`),
//! checkpoint and matrix-file persistence (`matrix-core-persist`), and the
//! timetable builder (`matrix-core-timetable`) into the three public entry
//! points: [`build_master_matrix`], [`partial_rebuild`], and
//! [`rolling_resequence`].
//!
//! Construct a [`MatrixConfig`] (from a file with [`MatrixConfig::from_file`]
//! or programmatically with [`MatrixConfig::default`]), call
//! [`logging::init_logging`] once at process start, then call one of the
//! entry points above.

pub mod build;
pub mod config;
pub mod error;
pub mod logging;

pub use build::{build_master_matrix, partial_rebuild, rolling_resequence};
pub use config::MatrixConfig;
pub use error::MatrixError;

pub use matrix_core_domain::{
    AnalyzerRow, ChosenRow, DomainError, Outcome, PerSlotHistory, Session, SequencerState, Stream, StreamConfig,
};
pub use matrix_core_history::{RunHistory, RunMode, RunRecord};
pub use matrix_core_persist::{Checkpoint, CheckpointManager, CheckpointMeta, MatrixFileManager};
pub use matrix_core_sequencer::{BuildOptions, BuildResult, ResequenceResult, SequencerError};
pub use matrix_core_timetable::{SummaryStatistics, Timetable, TimetableBuilder};
