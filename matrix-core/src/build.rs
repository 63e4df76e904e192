use crate::config::MatrixConfig;
use crate::error::MatrixError;
use matrix_core_domain::Stream;
use matrix_core_io::LoadOptions;
use matrix_core_sequencer::{BuildOptions, BuildResult, ResequenceResult};
use tracing::info_span;

fn build_options(config: &MatrixConfig) -> Result<BuildOptions, MatrixError> {
    Ok(BuildOptions {
        analyzer_runs_dir: config.analyzer_runs_dir.clone(),
        matrix_dir: config.matrix_dir.clone(),
        checkpoints_dir: config.checkpoints_dir.clone(),
        timetable_dir: config.timetable_dir.clone(),
        run_history_path: config.run_history_path.clone(),
        critical_streams: config.resolved_critical_streams()?,
        stream_filters: config.resolved_stream_filters()?,
        contract_multiplier: config.contract_multiplier,
        dom_blocked_days: config.dom_blocked_days.clone(),
        load_options: LoadOptions {
            start_date: config.start_date,
            end_date: config.end_date,
            specific_date: config.specific_date,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            allow_invalid_dates_salvage: config.allow_invalid_dates_salvage,
        },
    })
}

/// `buildMasterMatrix` (§6.7): full rebuild across every discovered stream.
pub fn build_master_matrix(config: &MatrixConfig) -> Result<BuildResult, MatrixError> {
    let _span = info_span!("build_master_matrix", dir = %config.analyzer_runs_dir.display()).entered();
    let opts = build_options(config)?;
    matrix_core_sequencer::full_rebuild(&opts).map_err(MatrixError::from)
}

/// Partial rebuild (§4.10): reprocess only `streams`, preserving every other
/// stream's existing matrix rows untouched.
pub fn partial_rebuild(config: &MatrixConfig, streams: &[Stream]) -> Result<BuildResult, MatrixError> {
    let _span = info_span!("partial_rebuild", streams = streams.len()).entered();
    let opts = build_options(config)?;
    matrix_core_sequencer::partial_rebuild(&opts, streams).map_err(MatrixError::from)
}

/// `rollingResequence` (§6.7): reprocess only the tail `window_days` trading
/// days, restoring sequencer state from a checkpoint. Falls back to
/// `config.resequence_days` (`MATRIX_REPROCESS_TRADING_DAYS`, §6.6) when
/// `window_days` is `None`.
pub fn rolling_resequence(config: &MatrixConfig, window_days: Option<u32>) -> Result<ResequenceResult, MatrixError> {
    let window_days = window_days.unwrap_or(config.resequence_days);
    let _span = info_span!("rolling_resequence", window_days).entered();
    let opts = build_options(config)?;
    matrix_core_sequencer::rolling_resequence(&opts, window_days).map_err(MatrixError::from)
}
