use crate::error::SequencerError;
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use matrix_core_domain::time::{normalize_time, score_of, session_of, slot_ends, time_sort_key};
use matrix_core_domain::{
    AnalyzerRow, ChosenRow, Outcome, Session, SequencerState, Stream, StreamConfig,
};
use matrix_core_history::update_day_scores;
use matrix_core_selector::select_trade_for_time;
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// One stream's full daily-loop pass (C7): every emitted row plus the final
/// [`SequencerState`], which only the state-capturing (sequential) variant
/// needs (§4.7.3).
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub rows: Vec<ChosenRow>,
    pub final_state: SequencerState,
}

/// Run the sequencer's daily loop for one stream (§4.7).
///
/// `rows` need not be pre-grouped by day, but must already be sorted
/// ascending by `trade_date` (the data loader guarantees this, §4.3).
/// `initial_state` seeds a resequence/restore; `None` starts fresh.
/// `year_filter` implements the optional display-year gate of §4.7.2 step 7
/// — histories and `current_time` advance regardless of whether a row is
/// actually emitted.
pub fn process_stream_daily(
    stream: &Stream,
    rows: &[AnalyzerRow],
    config: &StreamConfig,
    initial_state: Option<SequencerState>,
    year_filter: Option<i32>,
) -> Result<StreamOutcome, SequencerError> {
    let session = rows.first().map(|r| r.session).unwrap_or(Session::S1);
    let selectable = config.selectable_times(session)?;

    let mut state = match initial_state {
        Some(restored) => {
            let (restored, fell_back) = SequencerState::restore(restored, &selectable);
            if fell_back {
                tracing::warn!(
                    stream = stream.as_str(),
                    "restored checkpoint slot not selectable; fell back to first selectable slot"
                );
            }
            restored
        }
        None => SequencerState::initial(session, &selectable),
    };

    let mut days: IndexMap<NaiveDate, Vec<AnalyzerRow>> = IndexMap::new();
    for row in rows {
        days.entry(row.trade_date).or_default().push(row.clone());
    }

    let mut out_rows = Vec::with_capacity(days.len());
    let mut prev_old_current: Option<SmolStr> = None;

    for (trade_date, day_rows) in &days {
        let canonical = slot_ends(state.current_session);

        let mut outcomes: IndexMap<SmolStr, Outcome> = IndexMap::new();
        let mut scores: IndexMap<SmolStr, i32> = IndexMap::new();
        for slot in canonical {
            let key = SmolStr::new(normalize_time(slot));
            let outcome = day_rows
                .iter()
                .find(|r| r.session == state.current_session && normalize_time(&r.time) == key.as_str())
                .map(|r| r.result)
                .unwrap_or(Outcome::NoTrade);
            outcomes.insert(key.clone(), outcome);
            scores.insert(key, score_of(outcome));
        }

        update_day_scores(&mut state, &scores, stream.as_str(), &trade_date.to_string())?;

        let old_current_today = state.current_time.clone();
        let result_at_current = outcomes
            .get(old_current_today.as_str())
            .copied()
            .unwrap_or(Outcome::NoTrade);

        let next = if result_at_current == Outcome::Loss {
            decide_time_change(&old_current_today, &state, &selectable)
        } else {
            None
        };

        let excluded: Vec<String> = config.exclude_times.iter().map(|t| normalize_time(t)).collect();
        let filtered_day_rows: Vec<AnalyzerRow> = day_rows
            .iter()
            .filter(|r| !excluded.contains(&normalize_time(&r.time)))
            .cloned()
            .collect();

        let selected = select_trade_for_time(&filtered_day_rows, &old_current_today, state.current_session);
        let mut chosen = build_chosen_row(stream, *trade_date, state.current_session, &old_current_today, selected);

        for slot in canonical {
            let key = SmolStr::new(normalize_time(slot));
            let score = scores.get(&key).copied().unwrap_or(0);
            let rolling = state.histories.get(&key).map(|h| h.sum()).unwrap_or(0);
            chosen.slot_points.insert(key.clone(), score);
            chosen.slot_rolling.insert(key, rolling);
        }
        chosen.sl = ChosenRow::compute_sl(chosen.target, chosen.range);

        chosen.time_change = match &prev_old_current {
            Some(p) if *p != old_current_today => Some(old_current_today.clone()),
            Some(_) => next.clone(),
            None => next.clone(),
        };

        chosen.entry_time = if !chosen.actual_trade_time.is_empty() {
            chosen.actual_trade_time.clone()
        } else {
            chosen.time.clone()
        };
        chosen.exit_time = if chosen.result == Outcome::NoTrade {
            SmolStr::new("")
        } else {
            chosen.time.clone()
        };
        chosen.r = if chosen.target != Decimal::ZERO {
            Some(chosen.profit / chosen.target)
        } else {
            None
        };
        chosen.pnl = chosen.profit_dollars;
        chosen.rs_value = chosen.slot_rolling.get(chosen.time.as_str()).map(|v| Decimal::from(*v));
        chosen.selected_time = chosen.time.clone();
        chosen.time_bucket = SmolStr::new(chosen.session.to_string());

        prev_old_current = Some(old_current_today);
        if let Some(next_slot) = next {
            state.current_time = next_slot;
            state.current_session = session_of(&state.current_time);
        }

        let include = year_filter.map(|y| trade_date.year() == y).unwrap_or(true);
        if include {
            out_rows.push(chosen);
        }
    }

    Ok(StreamOutcome {
        rows: out_rows,
        final_state: state,
    })
}

/// Loss-triggered slot-switch decision (§4.7.2 step 2). Pure function of
/// the state snapshot taken *after* today's history update.
fn decide_time_change(current_time: &str, state: &SequencerState, selectable: &[SmolStr]) -> Option<SmolStr> {
    let current_sum_after = state.histories.get(current_time).map(|h| h.sum()).unwrap_or(0);

    let mut candidates: Vec<(SmolStr, i32)> = selectable
        .iter()
        .filter(|slot| slot.as_str() != current_time)
        .map(|slot| {
            let sum = state.histories.get(slot).map(|h| h.sum()).unwrap_or(0);
            (slot.clone(), sum)
        })
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| time_sort_key(&a.0).cmp(&time_sort_key(&b.0))));

    let (candidate, candidate_sum) = candidates.into_iter().next()?;
    if candidate_sum > current_sum_after {
        Some(candidate)
    } else {
        None
    }
}

fn build_chosen_row(
    stream: &Stream,
    trade_date: NaiveDate,
    session: Session,
    current_time: &str,
    selected: Option<&AnalyzerRow>,
) -> ChosenRow {
    let time = SmolStr::new(current_time);
    let (instrument, direction, result, profit, target, range, peak, stop_loss, scf_s1, scf_s2, actual_trade_time) =
        match selected {
            Some(row) => (
                row.instrument.clone(),
                row.direction,
                row.result,
                row.profit,
                row.target,
                row.range,
                row.peak,
                row.stop_loss,
                row.scf_s1,
                row.scf_s2,
                row.time.clone(),
            ),
            None => (
                SmolStr::new(stream.instrument_root()),
                None,
                Outcome::NoTrade,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                None,
                None,
                None,
                SmolStr::new(""),
            ),
        };

    ChosenRow {
        trade_date,
        stream: stream.clone(),
        instrument,
        session,
        direction,
        result,
        profit,
        profit_dollars: profit,
        target,
        range,
        peak,
        stop_loss,
        scf_s1,
        scf_s2,
        time,
        actual_trade_time,
        time_change: None,
        sl: Decimal::ZERO,
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
        entry_time: SmolStr::new(""),
        exit_time: SmolStr::new(""),
        entry_price: None,
        exit_price: None,
        r: None,
        pnl: Decimal::ZERO,
        rs_value: None,
        selected_time: SmolStr::new(""),
        time_bucket: SmolStr::new(""),
    }
}

/// Run every stream's daily loop sequentially, capturing final state
/// (§4.7.3). This is the only variant checkpoint creation and rolling
/// resequence restore may use.
pub fn run_sequential(
    streams_data: &IndexMap<Stream, Vec<AnalyzerRow>>,
    configs: &IndexMap<Stream, StreamConfig>,
    initial_states: &IndexMap<Stream, SequencerState>,
    year_filter: Option<i32>,
) -> Result<IndexMap<Stream, StreamOutcome>, SequencerError> {
    let mut out = IndexMap::new();
    for (stream, rows) in streams_data {
        let config = configs.get(stream).cloned().unwrap_or_default();
        let initial = initial_states.get(stream).cloned();
        let outcome = process_stream_daily(stream, rows, &config, initial, year_filter)?;
        out.insert(stream.clone(), outcome);
    }
    Ok(out)
}

/// Run every stream's daily loop in parallel, discarding final state
/// (§4.7.3). Row-by-row output must equal [`run_sequential`]'s rows after a
/// canonical sort (I7, P2) — streams are independent, so fan-out across
/// `rayon`'s pool cannot change the result.
pub fn run_parallel_rows_only(
    streams_data: &IndexMap<Stream, Vec<AnalyzerRow>>,
    configs: &IndexMap<Stream, StreamConfig>,
    initial_states: &IndexMap<Stream, SequencerState>,
    year_filter: Option<i32>,
) -> Result<Vec<ChosenRow>, SequencerError> {
    use rayon::prelude::*;

    let results: Vec<Result<Vec<ChosenRow>, SequencerError>> = streams_data
        .par_iter()
        .map(|(stream, rows)| {
            let config = configs.get(stream).cloned().unwrap_or_default();
            let initial = initial_states.get(stream).cloned();
            process_stream_daily(stream, rows, &config, initial, year_filter).map(|outcome| outcome.rows)
        })
        .collect();

    let mut all_rows = Vec::new();
    for result in results {
        all_rows.extend(result?);
    }
    Ok(all_rows)
}
