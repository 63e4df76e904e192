#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # Matrix-Core-Filter
//!
//! The Filter Engine (C4): per-stream day-of-week, day-of-month and
//! slot-time exclusions, producing `final_allowed` and the supporting
//! derived date/session fields on a [`ChosenRow`].
//!
//! Filtering affects selection/`final_allowed` only (§4.4) — it never
//! touches rolling-history updates or scoring, which run unconditionally
//! against every canonical slot in `matrix-core-sequencer` regardless of
//! what this crate decides.

use chrono::Datelike;
use matrix_core_domain::{ChosenRow, StreamConfig};
use smol_str::SmolStr;
use tracing::warn;

/// Day-of-month values that block a "2" stream, independent of per-stream
/// config (§6.6).
pub const DOM_BLOCKED_DAYS: &[u32] = &[4, 16, 30];

fn weekday_full_name(date: chrono::NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

/// Apply the full filter rule chain to one already-built [`ChosenRow`]
/// (§4.4). Rule order: day-of-week, then day-of-month, then slot-time,
/// each layered — once `final_allowed` goes false, later rules still
/// append their own reasons rather than short-circuiting, so the
/// `filter_reasons` list is a complete record of every rule that fired.
pub fn apply_filters(row: &mut ChosenRow, config: &StreamConfig, dom_blocked_days: &[u32]) {
    row.day_of_month = row.trade_date.day();
    row.dow = row.trade_date.weekday().num_days_from_monday();
    row.dow_full = SmolStr::new(weekday_full_name(row.trade_date));
    row.month = row.trade_date.month();
    row.session_index = match row.session {
        matrix_core_domain::Session::S1 => 1,
        matrix_core_domain::Session::S2 => 2,
    };
    row.is_two_stream = row.stream.is_two_stream();
    row.dom_blocked = row.is_two_stream && dom_blocked_days.contains(&row.day_of_month);

    let mut reasons = Vec::new();
    let mut allowed = true;

    // Rule 1: day-of-week exclusion.
    if config
        .exclude_days_of_week
        .iter()
        .any(|d| d.eq_ignore_ascii_case(row.dow_full.as_str()))
    {
        reasons.push(SmolStr::new("excluded_day_of_week"));
        allowed = false;
    }

    // Rule 2: day-of-month exclusion (per-stream config, plus the
    // global DOM_BLOCKED_DAYS gate for "2" streams).
    if config.exclude_days_of_month.contains(&row.day_of_month) {
        reasons.push(SmolStr::new("excluded_day_of_month"));
        allowed = false;
    }
    if row.dom_blocked {
        reasons.push(SmolStr::new("dom_blocked_day"));
        allowed = false;
    }

    // Rule 3: slot-time exclusion. Prefer `actual_trade_time`; fall back to
    // `time` with a warning, since a fallback indicates missing sequencer
    // metadata upstream (§4.4).
    let compare_time = if !row.actual_trade_time.is_empty() {
        row.actual_trade_time.as_str()
    } else {
        warn!(
            stream = %row.stream.as_str(),
            trade_date = %row.trade_date,
            "falling back to Time for slot-time exclusion check; actual_trade_time missing"
        );
        row.time.as_str()
    };
    let normalized_compare = matrix_core_domain::time::normalize_time(compare_time);
    if config
        .exclude_times
        .iter()
        .any(|t| matrix_core_domain::time::normalize_time(t) == normalized_compare)
    {
        reasons.push(SmolStr::new("excluded_time"));
        allowed = false;
    }

    row.filter_reasons = reasons;
    row.final_allowed = allowed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use matrix_core_domain::{Direction, Outcome, Session, Stream};
    use rust_decimal::Decimal;

    fn base_row(trade_date: NaiveDate) -> ChosenRow {
        ChosenRow {
            trade_date,
            stream: Stream::parse("ES2").unwrap(),
            instrument: SmolStr::new("ES"),
            session: Session::S2,
            direction: Some(Direction::Long),
            result: Outcome::Win,
            profit: Decimal::ONE,
            profit_dollars: Decimal::ONE,
            target: Decimal::ONE,
            range: Decimal::ONE,
            peak: Decimal::ZERO,
            stop_loss: None,
            scf_s1: None,
            scf_s2: None,
            time: SmolStr::new("09:30"),
            actual_trade_time: SmolStr::new("09:30"),
            time_change: None,
            sl: Decimal::ONE,
            slot_points: IndexMap::new(),
            slot_rolling: IndexMap::new(),
            day_of_month: 0,
            dow: 0,
            dow_full: SmolStr::new(""),
            month: 0,
            session_index: 0,
            is_two_stream: false,
            dom_blocked: false,
            filter_reasons: Vec::new(),
            final_allowed: true,
            global_trade_id: None,
            entry_time: SmolStr::new("09:30"),
            exit_time: SmolStr::new(""),
            entry_price: None,
            exit_price: None,
            r: None,
            pnl: Decimal::ONE,
            rs_value: None,
            selected_time: SmolStr::new("09:30"),
            time_bucket: SmolStr::new("09:30"),
        }
    }

    #[test]
    fn dom_blocked_day_blocks_two_stream() {
        let mut row = base_row(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        apply_filters(&mut row, &StreamConfig::default(), DOM_BLOCKED_DAYS);
        assert!(!row.final_allowed);
        assert!(row.filter_reasons.contains(&SmolStr::new("dom_blocked_day")));
    }

    #[test]
    fn excluded_time_blocks_regardless_of_other_rules() {
        let mut row = base_row(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        let config = StreamConfig {
            exclude_times: vec![SmolStr::new("09:30")],
            ..Default::default()
        };
        apply_filters(&mut row, &config, DOM_BLOCKED_DAYS);
        assert!(!row.final_allowed);
        assert!(row.filter_reasons.contains(&SmolStr::new("excluded_time")));
    }

    #[test]
    fn unfiltered_day_is_allowed() {
        let mut row = base_row(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        apply_filters(&mut row, &StreamConfig::default(), DOM_BLOCKED_DAYS);
        assert!(row.final_allowed);
        assert!(row.filter_reasons.is_empty());
    }
}
