#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # Matrix-Core-Selector
//!
//! The Trade Selector (C6): given a trading day's rows and the sequencer's
//! current slot, returns the unique row to execute, or nothing. A pure
//! lookup — it never infers, falls back, or switches slots. Slot-switching
//! is the sequencer's (`matrix-core-sequencer`) job alone.

use matrix_core_domain::{AnalyzerRow, Session};

/// Select the unique analyzer row matching `(current_time, current_session)`
/// among `day_rows` (§4.6).
///
/// `day_rows` is expected to already have excluded-time rows removed by the
/// filter engine (C4); this function re-checks nothing about exclusions — it
/// is a pure `(time, session) -> row` lookup. Returns `None` on zero or
/// multiple matches being impossible to disambiguate; duplicate matches are
/// a data-quality concern upstream, not something this function resolves,
/// so the first match found is returned deterministically by row order.
pub fn select_trade_for_time<'a>(
    day_rows: &'a [AnalyzerRow],
    current_time: &str,
    current_session: Session,
) -> Option<&'a AnalyzerRow> {
    let normalized_target = matrix_core_domain::time::normalize_time(current_time);

    day_rows.iter().find(|row| {
        row.session == current_session
            && matrix_core_domain::time::normalize_time(&row.time) == normalized_target
    })
}
