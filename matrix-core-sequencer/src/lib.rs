#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! Per-stream sequencer state machine (C7), Master Matrix orchestrator
//! (C10), and rolling resequence engine (C11).

pub mod error;
pub mod orchestrator;
pub mod resequence;
pub mod schema;
pub mod sequencer;

pub use error::SequencerError;
pub use orchestrator::{assign_global_trade_ids, canonical_sort, full_rebuild, partial_rebuild, BuildOptions, BuildResult};
pub use resequence::{find_trading_days_back, rolling_resequence, ResequenceResult};
pub use schema::normalize_schema;
pub use sequencer::{process_stream_daily, run_parallel_rows_only, run_sequential, StreamOutcome};
