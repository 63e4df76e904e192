#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Matrix-Core-Domain
//!
//! Dependency-free domain types shared by every other Matrix Core crate:
//! stream/session identity, canonical time slots, analyzer/chosen row
//! shapes, rolling per-slot history, sequencer state, and the shared error
//! taxonomy.
//!
//! This crate performs no I/O. It exists so that `matrix-core-io`,
//! `matrix-core-filter`, `matrix-core-selector`, `matrix-core-sequencer`,
//! `matrix-core-persist` and `matrix-core-timetable` can all speak the same
//! vocabulary without depending on each other.

/// Stream and instrument identity, including the canonical `^[A-Z]{2,3}[12]$`
/// stream-id grammar.
pub mod stream;

/// Canonical session/time-slot tables (`SLOT_ENDS`), time normalization and
/// scoring utilities (C1).
pub mod time;

/// Trade outcome scoring (`Win`/`Loss`/`BreakEven`/`NoTrade`/...).
pub mod outcome;

/// Wire-level analyzer input row and the sequencer's chosen output row.
pub mod row;

/// Bounded rolling per-slot history and per-stream sequencer state.
pub mod state;

/// Shared, non-exhaustive contract-violation error taxonomy (§7).
pub mod error;

pub use error::{DomainError, InvariantViolation};
pub use outcome::Outcome;
pub use row::{AnalyzerRow, ChosenRow, Direction};
pub use state::{PerSlotHistory, SequencerState, StreamConfig};
pub use stream::{Session, Stream};
pub use time::{ROLLING_WINDOW_SIZE, score_of, session_of, slot_ends, time_sort_key};
