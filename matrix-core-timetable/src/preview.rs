use crate::contract::{canonical_streams, Timetable, TimetableStreamEntry};
use crate::error::TimetableError;
use chrono::Utc;
use chrono_tz::America::Chicago;
use indexmap::IndexMap;
use matrix_core_domain::time::{normalize_time, score_of, slot_ends};
use matrix_core_domain::{AnalyzerRow, Stream, ROLLING_WINDOW_SIZE};
use matrix_core_filter::DOM_BLOCKED_DAYS;
use matrix_core_io::{load_all_streams, LoadOptions};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::HashSet;
use std::path::Path;

const SCF_THRESHOLD: f64 = 0.5;

/// Preview Timetable mode (C12.1, supplemental): the same output shape as
/// [`crate::builder::TimetableBuilder`], computed directly from raw analyzer
/// parquet files rather than a completed Master Matrix. An operator
/// cross-check / early-preview path, never wired up automatically — C13
/// always drives the matrix-based builder.
pub fn generate_timetable_preview(analyzer_runs_dir: &Path) -> Result<Timetable, TimetableError> {
    let streams = canonical_streams();
    let critical: HashSet<Stream> = HashSet::new();
    let data = load_all_streams(analyzer_runs_dir, &streams, &critical, &LoadOptions::default())?;

    let entries = streams
        .into_iter()
        .map(|stream| {
            let rows = data.get(&stream).cloned().unwrap_or_default();
            preview_entry_for_stream(stream, &rows)
        })
        .collect();

    Ok(Timetable {
        as_of: Utc::now().with_timezone(&Chicago).to_rfc3339(),
        trading_date: String::new(),
        timezone: SmolStr::new("America/Chicago"),
        source: SmolStr::new("analyzer_preview"),
        streams: entries,
    })
}

/// RS (rolling-sum) value per canonical slot: same `Win=+1, Loss=-2,
/// BE/other=0` scoring function as the sequencer (C1), over the last
/// [`ROLLING_WINDOW_SIZE`] trading days present at that slot, restricted to
/// `session`.
pub fn calculate_rs_for_stream(rows: &[AnalyzerRow], session: matrix_core_domain::Session) -> IndexMap<SmolStr, i32> {
    let mut by_slot: IndexMap<SmolStr, Vec<(chrono::NaiveDate, i32)>> = IndexMap::new();

    for row in rows {
        if row.session != session {
            continue;
        }
        let slot = SmolStr::new(normalize_time(&row.time));
        by_slot.entry(slot).or_default().push((row.trade_date, score_of(row.result)));
    }

    let mut rs = IndexMap::new();
    for slot in slot_ends(session) {
        let slot_key = SmolStr::new(*slot);
        let mut scores = by_slot.remove(&slot_key).unwrap_or_default();
        scores.sort_by_key(|(date, _)| *date);
        let window: i32 = scores.iter().rev().take(ROLLING_WINDOW_SIZE).map(|(_, score)| score).sum();
        rs.insert(slot_key, window);
    }
    rs
}

enum SelectionReason {
    Chosen,
    DefaultFirstTime,
    NoRsData,
}

/// Pick the slot with the highest RS value; fall back to the session's
/// first canonical slot when every value is `<= 0` or there is no data at
/// all (§4.12.1).
///
/// `has_observations` must reflect whether any row was seen for `session`
/// at all — `rs` itself always has one entry per canonical slot (defaulted
/// to `0` by [`calculate_rs_for_stream`]), so it is never empty and can't be
/// used to detect the no-data case.
fn select_best_time(
    rs: &IndexMap<SmolStr, i32>,
    session: matrix_core_domain::Session,
    has_observations: bool,
) -> (SmolStr, SelectionReason) {
    if !has_observations {
        return (SmolStr::new(slot_ends(session)[0]), SelectionReason::NoRsData);
    }

    // `rs` iterates in chronological slot order (built from `slot_ends`), so
    // a strict `>` comparison naturally keeps the earliest slot on a tie.
    let mut best: Option<(&SmolStr, i32)> = None;
    for (slot, score) in rs.iter() {
        let is_better = match best {
            Some((_, best_score)) => *score > best_score,
            None => true,
        };
        if is_better {
            best = Some((slot, *score));
        }
    }

    match best {
        Some((slot, score)) if score > 0 => (slot.clone(), SelectionReason::Chosen),
        _ => (SmolStr::new(slot_ends(session)[0]), SelectionReason::DefaultFirstTime),
    }
}

fn scf_blocks(row: Option<&AnalyzerRow>, session: matrix_core_domain::Session) -> bool {
    let Some(row) = row else { return false };
    let scf = match session {
        matrix_core_domain::Session::S1 => row.scf_s1,
        matrix_core_domain::Session::S2 => row.scf_s2,
    };
    scf.map(|value| value < Decimal::try_from(SCF_THRESHOLD).unwrap_or_default()).unwrap_or(false)
}

fn preview_entry_for_stream(stream: Stream, rows: &[AnalyzerRow]) -> TimetableStreamEntry {
    let session = stream.session();
    let instrument = SmolStr::new(stream.instrument_root());
    let rs = calculate_rs_for_stream(rows, session);
    let has_observations = rows.iter().any(|r| r.session == session);
    let (slot, reason) = select_best_time(&rs, session, has_observations);

    let latest_at_slot = rows
        .iter()
        .filter(|r| r.session == session && normalize_time(&r.time) == slot.as_str())
        .max_by_key(|r| r.trade_date);

    let dom_blocked = stream.is_two_stream()
        && latest_at_slot
            .map(|r| DOM_BLOCKED_DAYS.contains(&chrono::Datelike::day(&r.trade_date)))
            .unwrap_or(false);
    let scf_blocked = scf_blocks(latest_at_slot, session);

    let (enabled, block_reason) = match reason {
        SelectionReason::NoRsData => (false, Some(SmolStr::new("no_rs_data"))),
        SelectionReason::DefaultFirstTime if dom_blocked => (false, Some(SmolStr::new("dom_blocked_day"))),
        SelectionReason::DefaultFirstTime if scf_blocked => (false, Some(SmolStr::new("scf_below_threshold"))),
        SelectionReason::DefaultFirstTime => (true, Some(SmolStr::new("default_first_time"))),
        SelectionReason::Chosen if dom_blocked => (false, Some(SmolStr::new("dom_blocked_day"))),
        SelectionReason::Chosen if scf_blocked => (false, Some(SmolStr::new("scf_below_threshold"))),
        SelectionReason::Chosen => (true, None),
    };

    TimetableStreamEntry {
        stream,
        instrument,
        session,
        slot_time: slot.clone(),
        decision_time: slot,
        enabled,
        block_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use matrix_core_domain::{Direction, Outcome, Session};

    fn row(stream: &str, trade_date: NaiveDate, time: &str, result: Outcome) -> AnalyzerRow {
        AnalyzerRow {
            trade_date,
            time: SmolStr::new(time),
            stream: Stream::parse(stream).unwrap(),
            instrument: SmolStr::new(&stream[..stream.len() - 1]),
            session: Session::S1,
            direction: Some(Direction::Long),
            result,
            profit: Decimal::ONE,
            target: Decimal::ONE,
            range: Decimal::ONE,
            peak: Decimal::ZERO,
            stop_loss: None,
            scf_s1: None,
            scf_s2: None,
            onr: None,
            onr_high: None,
            onr_low: None,
        }
    }

    #[test]
    fn selects_highest_rs_slot() {
        let rows = vec![
            row("ES1", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "07:30", Outcome::Loss),
            row("ES1", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "08:00", Outcome::Win),
            row("ES1", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), "08:00", Outcome::Win),
        ];
        let rs = calculate_rs_for_stream(&rows, Session::S1);
        let (slot, _) = select_best_time(&rs, Session::S1, true);
        assert_eq!(slot.as_str(), "08:00");
    }

    #[test]
    fn no_data_falls_back_with_no_rs_data_reason() {
        let rs = calculate_rs_for_stream(&[], Session::S1);
        let (slot, reason) = select_best_time(&rs, Session::S1, false);
        assert_eq!(slot.as_str(), "07:30");
        assert!(matches!(reason, SelectionReason::NoRsData));
    }

    #[test]
    fn all_non_positive_falls_back_to_default_first_time() {
        let rows = vec![
            row("ES1", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "07:30", Outcome::Loss),
            row("ES1", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "08:00", Outcome::Loss),
        ];
        let rs = calculate_rs_for_stream(&rows, Session::S1);
        let (slot, reason) = select_best_time(&rs, Session::S1, true);
        assert_eq!(slot.as_str(), "07:30");
        assert!(matches!(reason, SelectionReason::DefaultFirstTime));
    }

    #[test]
    fn no_rows_for_stream_blocks_with_no_rs_data_even_though_rs_map_is_populated() {
        let entry = preview_entry_for_stream(Stream::parse("ES1").unwrap(), &[]);
        assert!(!entry.enabled);
        assert_eq!(entry.block_reason.as_deref(), Some("no_rs_data"));
    }
}
