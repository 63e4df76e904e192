#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! Execution timetable derivation (C12, C12.1) and build-report summary
//! statistics (C14).

pub mod builder;
pub mod contract;
pub mod error;
pub mod preview;
pub mod statistics;

pub use builder::TimetableBuilder;
pub use contract::{canonical_streams, Timetable, TimetableStreamEntry, CANONICAL_INSTRUMENTS};
pub use error::TimetableError;
pub use preview::{calculate_rs_for_stream, generate_timetable_preview};
pub use statistics::{log_summary, SummaryStatistics};
