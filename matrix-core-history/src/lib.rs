#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # Matrix-Core-History
//!
//! Two small, independent pieces of state machinery:
//!
//! - The Rolling History Manager (C5): batch per-day updates to a stream's
//!   bounded per-slot histories, plus the uniform-length invariant check
//!   (I5). The underlying bounded FIFO itself
//!   ([`matrix_core_domain::PerSlotHistory`]) lives in the domain crate
//!   since its shape (capacity 13, FIFO eviction) is part of the shared
//!   vocabulary; this crate supplies the "update every slot for one day"
//!   operation the sequencer's daily loop calls once per iteration.
//! - Run History (C9): an append-only JSON-Lines log of every build
//!   attempt, tolerant of malformed lines on read.

pub mod rolling;
pub mod run_history;

pub use rolling::update_day_scores;
pub use run_history::{RunHistory, RunMode, RunRecord};
