use crate::error::SequencerError;
use crate::schema::normalize_schema;
use crate::sequencer::{run_parallel_rows_only, run_sequential};
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use matrix_core_domain::time::{normalize_time, time_sort_key};
use matrix_core_domain::{AnalyzerRow, ChosenRow, DomainError, InvariantViolation, SequencerState, Stream, StreamConfig};
use matrix_core_filter::apply_filters;
use matrix_core_history::{RunHistory, RunMode, RunRecord};
use matrix_core_io::{discover_streams, load_all_streams, LoadOptions};
use matrix_core_persist::{CheckpointManager, MatrixFileManager};
use matrix_core_timetable::{log_summary, TimetableBuilder};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// Everything the orchestrator (C10) and the rolling resequence engine
/// (C11) need that isn't derivable from analyzer data itself (§6.6, §6.7).
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub analyzer_runs_dir: PathBuf,
    pub matrix_dir: PathBuf,
    pub checkpoints_dir: PathBuf,
    pub timetable_dir: PathBuf,
    pub run_history_path: PathBuf,
    pub critical_streams: HashSet<Stream>,
    pub stream_filters: IndexMap<Stream, StreamConfig>,
    pub contract_multiplier: Decimal,
    pub dom_blocked_days: Vec<u32>,
    pub load_options: LoadOptions,
}

/// Build the `on_saved` side effect the file manager (C13) invokes after a
/// successful matrix write: regenerate the execution timetable (C12). A
/// failure here is logged by the caller and never fails the matrix save
/// itself (§4.13, §7 "Timetable write failure (recoverable)").
pub(crate) fn timetable_side_effect(timetable_dir: PathBuf) -> impl FnOnce(&[ChosenRow]) -> Result<(), Box<dyn std::error::Error>> {
    move |rows: &[ChosenRow]| {
        TimetableBuilder::new(timetable_dir)
            .write_from_master_matrix(rows, None)
            .map(|_| ())
            .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)
    }
}

/// Append a [`RunRecord`] to the run-history log (C9), logging rather than
/// failing the build on a write error — forensic history is best-effort,
/// never load-bearing for the build's own success/failure (§7).
fn record_run(run_history_path: &PathBuf, record: &RunRecord) {
    if let Err(err) = RunHistory::new(run_history_path).append(record) {
        tracing::warn!(%err, run_id = %record.run_id, "failed to append run history record");
    }
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub rows: Vec<ChosenRow>,
    pub run_record: RunRecord,
}

/// `(Stream, trade_date, entry_time) -> Time` fingerprint taken immediately
/// after the sequencer pass (§4.10 "Time immutability check", §9). Carried
/// through filtering/sorting and re-verified at the end — any divergence
/// means something downstream mutated `Time`, violating I3.
pub(crate) type TimeFingerprint = HashMap<(String, NaiveDate, String), String>;

pub(crate) fn fingerprint_rows(rows: &[ChosenRow]) -> TimeFingerprint {
    rows.iter()
        .map(|r| {
            (
                (r.stream.as_str().to_string(), r.trade_date, normalize_time(&r.entry_time)),
                r.time.to_string(),
            )
        })
        .collect()
}

pub(crate) fn verify_time_ownership(rows: &[ChosenRow], fingerprint: &TimeFingerprint) -> Result<(), SequencerError> {
    if fingerprint.is_empty() {
        return Ok(());
    }

    let mut matches = 0usize;
    for row in rows {
        let key = (row.stream.as_str().to_string(), row.trade_date, normalize_time(&row.entry_time));
        if let Some(expected) = fingerprint.get(&key) {
            matches += 1;
            if expected.as_str() != row.time.as_str() {
                return Err(DomainError::Invariant(InvariantViolation::TimeOwnership {
                    stream: row.stream.as_str().to_string(),
                    trade_date: row.trade_date.to_string(),
                    expected: expected.clone(),
                    found: row.time.to_string(),
                })
                .into());
            }
        }
    }

    if matches == 0 {
        return Err(DomainError::Invariant(InvariantViolation::TimeOwnershipNoMatches {
            stream: "<all>".to_string(),
        })
        .into());
    }

    Ok(())
}

/// Canonical sort (I2): `(Stream, trade_date, entry_time)` ascending.
pub fn canonical_sort(rows: &mut [ChosenRow]) {
    rows.sort_by(|a, b| {
        a.stream
            .as_str()
            .cmp(b.stream.as_str())
            .then(a.trade_date.cmp(&b.trade_date))
            .then_with(|| time_sort_key(&a.entry_time).cmp(&time_sort_key(&b.entry_time)))
    });
}

/// Assign `global_trade_id` as `1..N` with no gaps, after the canonical
/// sort (I2, P7).
pub fn assign_global_trade_ids(rows: &mut [ChosenRow]) {
    for (idx, row) in rows.iter_mut().enumerate() {
        row.global_trade_id = Some(idx as u64 + 1);
    }
}

pub(crate) fn resolved_configs(streams: &[Stream], stream_filters: &IndexMap<Stream, StreamConfig>) -> IndexMap<Stream, StreamConfig> {
    for key in stream_filters.keys() {
        if !streams.contains(key) {
            tracing::warn!(stream = key.as_str(), "stream filter entry has no matching discovered stream; ignoring");
        }
    }

    streams
        .iter()
        .map(|stream| (stream.clone(), stream_filters.get(stream).cloned().unwrap_or_default()))
        .collect()
}

pub(crate) fn apply_filter_pass(rows: &mut [ChosenRow], configs: &IndexMap<Stream, StreamConfig>, dom_blocked_days: &[u32]) {
    let default_config = StreamConfig::default();
    for row in rows.iter_mut() {
        let config = configs.get(&row.stream).unwrap_or(&default_config);
        apply_filters(row, config, dom_blocked_days);
    }
}

/// Full rebuild (§4.10): discover every stream, load all data, run the
/// sequencer in parallel, normalize schema, filter, canonical-sort, assign
/// ids, verify I3, persist, and checkpoint.
///
/// Every attempt, successful or not, is appended to the run-history log
/// (C9, §4.9) — a fatal error still produces a `success: false` record
/// naming the failure before it is re-raised to the caller.
pub fn full_rebuild(opts: &BuildOptions) -> Result<BuildResult, SequencerError> {
    let start = Instant::now();
    let run_id = Uuid::new_v4().to_string();

    match full_rebuild_inner(opts, &run_id, start) {
        Ok(result) => {
            record_run(&opts.run_history_path, &result.run_record);
            Ok(result)
        }
        Err(err) => {
            record_run(
                &opts.run_history_path,
                &RunRecord {
                    run_id,
                    mode: RunMode::FullRebuild,
                    timestamp: Utc::now(),
                    requested_days: None,
                    reprocess_start_date: None,
                    merged_data_max_date: None,
                    checkpoint_restore_id: None,
                    rows_read: 0,
                    rows_written: 0,
                    duration_seconds: start.elapsed().as_secs_f64(),
                    success: false,
                    error_message: Some(err.to_string()),
                },
            );
            Err(err)
        }
    }
}

/// Union discovered streams with the configured critical set (§7): a
/// critical stream with no directory at all must still reach
/// `load_all_streams` so its empty row set is recognized as fatal, rather
/// than silently never being considered.
pub(crate) fn streams_with_critical(discovered: Vec<Stream>, critical_streams: &HashSet<Stream>) -> Vec<Stream> {
    let mut streams = discovered;
    let present: HashSet<Stream> = streams.iter().cloned().collect();
    for stream in critical_streams {
        if !present.contains(stream) {
            streams.push(stream.clone());
        }
    }
    streams
}

fn full_rebuild_inner(opts: &BuildOptions, run_id: &str, start: Instant) -> Result<BuildResult, SequencerError> {
    let streams = streams_with_critical(discover_streams(&opts.analyzer_runs_dir), &opts.critical_streams);
    let streams_data = load_all_streams(&opts.analyzer_runs_dir, &streams, &opts.critical_streams, &opts.load_options)?;
    let ordered_data: IndexMap<Stream, Vec<AnalyzerRow>> = streams
        .iter()
        .map(|stream| (stream.clone(), streams_data.get(stream).cloned().unwrap_or_default()))
        .collect();

    let configs = resolved_configs(&streams, &opts.stream_filters);

    let mut rows = run_parallel_rows_only(&ordered_data, &configs, &IndexMap::new(), None)?;
    let fingerprint = fingerprint_rows(&rows);

    normalize_schema(&mut rows, opts.contract_multiplier);
    apply_filter_pass(&mut rows, &configs, &opts.dom_blocked_days);

    canonical_sort(&mut rows);
    assign_global_trade_ids(&mut rows);
    verify_time_ownership(&rows, &fingerprint)?;

    let rows_written = rows.len() as u64;
    let max_date = rows.iter().map(|r| r.trade_date).max();

    let matrix_manager = MatrixFileManager::new(&opts.matrix_dir);
    matrix_manager.save(&rows, None, timetable_side_effect(opts.timetable_dir.clone()))?;
    log_summary(&rows);

    if let Some(max_date) = max_date {
        // The checkpoint's per-stream state comes from an independent
        // sequential re-run (§4.7.3, §4.10) — not reused from the parallel
        // row-only pass above, which discards final state by design.
        match run_sequential(&ordered_data, &configs, &IndexMap::new(), None) {
            Ok(sequential) => {
                let states: IndexMap<Stream, SequencerState> =
                    sequential.into_iter().map(|(stream, outcome)| (stream, outcome.final_state)).collect();
                let checkpoint_manager = CheckpointManager::new(&opts.checkpoints_dir);
                if let Err(err) = checkpoint_manager.create(max_date, states) {
                    tracing::warn!(%err, "checkpoint creation failed after successful matrix build; build stands");
                }
            }
            Err(err) => {
                tracing::warn!(%err, "sequential state-capturing pass failed; skipping checkpoint creation");
            }
        }
    }

    let run_record = RunRecord {
        run_id: run_id.to_string(),
        mode: RunMode::FullRebuild,
        timestamp: Utc::now(),
        requested_days: None,
        reprocess_start_date: None,
        merged_data_max_date: max_date.map(|d| d.to_string()),
        checkpoint_restore_id: None,
        rows_read: rows_written,
        rows_written,
        duration_seconds: start.elapsed().as_secs_f64(),
        success: true,
        error_message: None,
    };

    Ok(BuildResult { rows, run_record })
}

/// Partial rebuild (§4.10): reprocess only `target_streams`, preserving
/// every other stream's existing matrix rows untouched.
///
/// Like [`full_rebuild`], every attempt is appended to the run-history log
/// regardless of outcome (C9, §4.9).
pub fn partial_rebuild(opts: &BuildOptions, target_streams: &[Stream]) -> Result<BuildResult, SequencerError> {
    let start = Instant::now();
    let run_id = Uuid::new_v4().to_string();

    match partial_rebuild_inner(opts, target_streams, &run_id, start) {
        Ok(result) => {
            record_run(&opts.run_history_path, &result.run_record);
            Ok(result)
        }
        Err(err) => {
            record_run(
                &opts.run_history_path,
                &RunRecord {
                    run_id,
                    mode: RunMode::PartialRebuild,
                    timestamp: Utc::now(),
                    requested_days: None,
                    reprocess_start_date: None,
                    merged_data_max_date: None,
                    checkpoint_restore_id: None,
                    rows_read: 0,
                    rows_written: 0,
                    duration_seconds: start.elapsed().as_secs_f64(),
                    success: false,
                    error_message: Some(err.to_string()),
                },
            );
            Err(err)
        }
    }
}

fn partial_rebuild_inner(
    opts: &BuildOptions,
    target_streams: &[Stream],
    run_id: &str,
    start: Instant,
) -> Result<BuildResult, SequencerError> {
    let matrix_manager = MatrixFileManager::new(&opts.matrix_dir);
    let existing_path = matrix_manager.get_latest_matrix_file();
    let mut preserved: Vec<ChosenRow> = match &existing_path {
        Some(path) => matrix_manager.load_existing(path)?,
        None => Vec::new(),
    };
    let target_set: HashSet<Stream> = target_streams.iter().cloned().collect();
    preserved.retain(|row| !target_set.contains(&row.stream));

    let streams_data =
        load_all_streams(&opts.analyzer_runs_dir, target_streams, &opts.critical_streams, &opts.load_options)?;
    let ordered_data: IndexMap<Stream, Vec<AnalyzerRow>> = target_streams
        .iter()
        .map(|stream| (stream.clone(), streams_data.get(stream).cloned().unwrap_or_default()))
        .collect();

    let configs = resolved_configs(target_streams, &opts.stream_filters);

    let mut new_rows = run_parallel_rows_only(&ordered_data, &configs, &IndexMap::new(), None)?;
    let fingerprint = fingerprint_rows(&new_rows);

    normalize_schema(&mut new_rows, opts.contract_multiplier);
    apply_filter_pass(&mut new_rows, &configs, &opts.dom_blocked_days);

    let mut all_rows = preserved;
    all_rows.extend(new_rows);

    canonical_sort(&mut all_rows);
    assign_global_trade_ids(&mut all_rows);
    verify_time_ownership(&all_rows, &fingerprint)?;

    let rows_written = all_rows.len() as u64;
    matrix_manager.save(&all_rows, None, timetable_side_effect(opts.timetable_dir.clone()))?;
    log_summary(&all_rows);

    let run_record = RunRecord {
        run_id: run_id.to_string(),
        mode: RunMode::PartialRebuild,
        timestamp: Utc::now(),
        requested_days: None,
        reprocess_start_date: None,
        merged_data_max_date: all_rows.iter().map(|r| r.trade_date).max().map(|d| d.to_string()),
        checkpoint_restore_id: None,
        rows_read: rows_written,
        rows_written,
        duration_seconds: start.elapsed().as_secs_f64(),
        success: true,
        error_message: None,
    };

    Ok(BuildResult { rows: all_rows, run_record })
}
