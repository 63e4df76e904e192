use crate::error::SequencerError;
use crate::orchestrator::{
    apply_filter_pass, assign_global_trade_ids, canonical_sort, fingerprint_rows, resolved_configs,
    streams_with_critical, verify_time_ownership, BuildOptions,
};
use crate::schema::normalize_schema;
use crate::sequencer::run_parallel_rows_only;
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use matrix_core_domain::{AnalyzerRow, ChosenRow, SequencerState, Stream};
use matrix_core_history::{RunHistory, RunMode, RunRecord};
use matrix_core_io::{discover_streams, load_all_streams};
use matrix_core_persist::{CheckpointManager, MatrixFileManager};
use matrix_core_timetable::log_summary;
use std::collections::BTreeSet;
use std::time::Instant;
use uuid::Uuid;

fn record_run(run_history_path: &std::path::Path, record: &RunRecord) {
    if let Err(err) = RunHistory::new(run_history_path).append(record) {
        tracing::warn!(%err, run_id = %record.run_id, "failed to append run history record");
    }
}

/// An empty-result `RunRecord` for a resequence attempt that failed before
/// any rows were produced (§7: "C11 returns an empty matrix plus a
/// RunSummary carrying `error` on fatal conditions within its own scope").
fn failed_run_record(run_id: String, window_days: u32, start: Instant, message: String) -> RunRecord {
    RunRecord {
        run_id,
        mode: RunMode::RollingResequence,
        timestamp: Utc::now(),
        requested_days: Some(window_days),
        reprocess_start_date: None,
        merged_data_max_date: None,
        checkpoint_restore_id: None,
        rows_read: 0,
        rows_written: 0,
        duration_seconds: start.elapsed().as_secs_f64(),
        success: false,
        error_message: Some(message),
    }
}

#[derive(Debug, Clone)]
pub struct ResequenceResult {
    pub rows: Vec<ChosenRow>,
    pub run_record: RunRecord,
    pub rows_preserved: u64,
    pub rows_resequenced: u64,
}

/// Date that is `days_back` *unique trading days* behind `from_date`,
/// counted against the presence-based calendar of dates that actually
/// appear in the merged analyzer data (§4.11 step 3) — never calendar-day
/// arithmetic, since weekends/holidays simply don't appear in the data.
pub fn find_trading_days_back(all_dates: &BTreeSet<NaiveDate>, from_date: NaiveDate, days_back: u32) -> Option<NaiveDate> {
    let sorted: Vec<NaiveDate> = all_dates.iter().copied().collect();
    let idx = sorted.iter().position(|d| *d == from_date)?;
    let target_idx = idx.checked_sub(days_back as usize)?;
    sorted.get(target_idx).copied()
}

/// Rolling resequence (C11, §4.11): reprocess only the last `window_days`
/// unique trading days, restoring sequencer state from the newest
/// checkpoint strictly before the window (the O1 resolution, SPEC_FULL.md
/// §9 / DESIGN.md), and concatenate with the preserved head of the existing
/// matrix.
///
/// Fatal conditions local to this engine's own scope (no usable analyzer
/// data, insufficient trading-day history, no checkpoint to restore from)
/// are reported as an `Ok` result with `run_record.success == false` rather
/// than an `Err` (§7) — deeper Tier-0 violations raised by the sequencer
/// pass or the I3 ownership check still propagate as `Err`. Every attempt,
/// either way, is appended to the run-history log (C9, §4.9).
pub fn rolling_resequence(opts: &BuildOptions, window_days: u32) -> Result<ResequenceResult, SequencerError> {
    let start = Instant::now();
    let run_id = Uuid::new_v4().to_string();

    match rolling_resequence_inner(opts, window_days, &run_id, start) {
        Ok(result) => {
            record_run(&opts.run_history_path, &result.run_record);
            Ok(result)
        }
        Err(err) => {
            record_run(&opts.run_history_path, &failed_run_record(run_id, window_days, start, err.to_string()));
            Err(err)
        }
    }
}

fn rolling_resequence_inner(
    opts: &BuildOptions,
    window_days: u32,
    run_id: &str,
    start: Instant,
) -> Result<ResequenceResult, SequencerError> {
    let streams = streams_with_critical(discover_streams(&opts.analyzer_runs_dir), &opts.critical_streams);
    let all_data = load_all_streams(&opts.analyzer_runs_dir, &streams, &opts.critical_streams, &opts.load_options)?;

    let all_dates: BTreeSet<NaiveDate> = all_data.values().flat_map(|rows| rows.iter().map(|r| r.trade_date)).collect();
    let Some(latest_date) = all_dates.iter().max().copied() else {
        return Ok(ResequenceResult {
            rows: Vec::new(),
            run_record: failed_run_record(
                run_id.to_string(),
                window_days,
                start,
                SequencerError::EmptyAnalyzerData.to_string(),
            ),
            rows_preserved: 0,
            rows_resequenced: 0,
        });
    };

    let Some(resequence_start) = find_trading_days_back(&all_dates, latest_date, window_days) else {
        return Ok(ResequenceResult {
            rows: Vec::new(),
            run_record: failed_run_record(
                run_id.to_string(),
                window_days,
                start,
                SequencerError::InsufficientHistory {
                    requested: window_days,
                    available: all_dates.len(),
                }
                .to_string(),
            ),
            rows_preserved: 0,
            rows_resequenced: 0,
        });
    };

    let matrix_manager = MatrixFileManager::new(&opts.matrix_dir);
    let existing_rows = match matrix_manager.get_latest_matrix_file() {
        Some(path) => matrix_manager.load_existing(&path)?,
        None => Vec::new(),
    };
    let mut head: Vec<ChosenRow> = existing_rows.into_iter().filter(|r| r.trade_date < resequence_start).collect();
    let rows_preserved = head.len() as u64;

    let checkpoint_manager = CheckpointManager::new(&opts.checkpoints_dir);
    let restored = checkpoint_manager.load_latest_before(resequence_start);
    let checkpoint_restore_id = restored.as_ref().map(|c| c.checkpoint_id.to_string());

    let initial_states: IndexMap<Stream, SequencerState> = match restored {
        Some(checkpoint) => checkpoint.streams,
        None => match checkpoint_manager.load_latest() {
            Some(latest) => {
                tracing::warn!(
                    checkpoint_date = %latest.checkpoint_date,
                    resequence_start = %resequence_start,
                    "no checkpoint strictly precedes the resequence window; falling back to the newest \
                     checkpoint overall"
                );
                latest.streams
            }
            None => {
                return Ok(ResequenceResult {
                    rows: Vec::new(),
                    run_record: failed_run_record(
                        run_id.to_string(),
                        window_days,
                        start,
                        SequencerError::CheckpointRequired.to_string(),
                    ),
                    rows_preserved: 0,
                    rows_resequenced: 0,
                });
            }
        },
    };

    let configs = resolved_configs(&streams, &opts.stream_filters);

    let window_data: IndexMap<Stream, Vec<AnalyzerRow>> = streams
        .iter()
        .map(|stream| {
            let rows = all_data
                .get(stream)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|row| row.trade_date >= resequence_start)
                .collect();
            (stream.clone(), rows)
        })
        .collect();

    let mut resequenced_rows = run_parallel_rows_only(&window_data, &configs, &initial_states, None)?;
    let rows_resequenced = resequenced_rows.len() as u64;

    let fingerprint = fingerprint_rows(&resequenced_rows);

    normalize_schema(&mut resequenced_rows, opts.contract_multiplier);
    apply_filter_pass(&mut resequenced_rows, &configs, &opts.dom_blocked_days);

    let mut all_rows = std::mem::take(&mut head);
    all_rows.extend(resequenced_rows);

    canonical_sort(&mut all_rows);
    assign_global_trade_ids(&mut all_rows);
    verify_time_ownership(&all_rows, &fingerprint)?;

    let rows_written = all_rows.len() as u64;
    matrix_manager.save(&all_rows, None, crate::orchestrator::timetable_side_effect(opts.timetable_dir.clone()))?;
    log_summary(&all_rows);

    let run_record = RunRecord {
        run_id: run_id.to_string(),
        mode: RunMode::RollingResequence,
        timestamp: Utc::now(),
        requested_days: Some(window_days),
        reprocess_start_date: Some(resequence_start.to_string()),
        merged_data_max_date: Some(latest_date.to_string()),
        checkpoint_restore_id,
        rows_read: rows_preserved + rows_resequenced,
        rows_written,
        duration_seconds: start.elapsed().as_secs_f64(),
        success: true,
        error_message: None,
    };

    Ok(ResequenceResult {
        rows: all_rows,
        run_record,
        rows_preserved,
        rows_resequenced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn trading_days_back_counts_unique_dates_not_calendar_days() {
        let mut dates = BTreeSet::new();
        for day in [1, 2, 5, 6, 7, 8, 9] {
            dates.insert(NaiveDate::from_ymd_opt(2026, 1, day).unwrap());
        }
        let from = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let back = find_trading_days_back(&dates, from, 2).unwrap();
        assert_eq!(back, NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
    }

    #[test]
    fn insufficient_history_returns_none() {
        let mut dates = BTreeSet::new();
        dates.insert(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        let from = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert!(find_trading_days_back(&dates, from, 5).is_none());
    }
}
