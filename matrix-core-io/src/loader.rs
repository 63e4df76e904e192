use crate::contract::{enforce_required_columns, enforce_trade_date_contract};
use crate::convert::row_from_dataframe;
use crate::discovery::monthly_files;
use crate::error::IoError;
use chrono::NaiveDate;
use matrix_core_domain::{AnalyzerRow, Stream};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Options shared across a full data-loading pass (§4.3, §6.6).
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub specific_date: Option<NaiveDate>,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub allow_invalid_dates_salvage: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            specific_date: None,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            allow_invalid_dates_salvage: false,
        }
    }
}

/// Load every stream's analyzer data in parallel (C3).
///
/// Worker count is sized `min(numStreams, 2*CPU)` (§5) — `rayon`'s global
/// pool is left to its own default sizing, which already approximates this,
/// and `par_iter` caps concurrent work to `streams.len()` naturally. A
/// missing critical stream aborts the whole load (§7); a missing
/// non-critical stream returns with an empty row set and a warning.
pub fn load_all_streams(
    analyzer_runs_dir: &Path,
    streams: &[Stream],
    critical_streams: &HashSet<Stream>,
    options: &LoadOptions,
) -> Result<HashMap<Stream, Vec<AnalyzerRow>>, IoError> {
    let results: Vec<Result<(Stream, Vec<AnalyzerRow>), IoError>> = streams
        .par_iter()
        .map(|stream| {
            let rows = load_stream_with_retry(analyzer_runs_dir, stream, options)?;
            if rows.is_empty() && critical_streams.contains(stream) {
                return Err(IoError::MissingCriticalStream(
                    stream.as_str().to_string(),
                    options.max_retries,
                ));
            }
            Ok((stream.clone(), rows))
        })
        .collect();

    let mut out = HashMap::with_capacity(streams.len());
    for result in results {
        let (stream, rows) = result?;
        if rows.is_empty() {
            warn!(stream = stream.as_str(), "stream produced no usable rows");
        }
        out.insert(stream, rows);
    }
    Ok(out)
}

fn load_stream_with_retry(
    analyzer_runs_dir: &Path,
    stream: &Stream,
    options: &LoadOptions,
) -> Result<Vec<AnalyzerRow>, IoError> {
    let mut attempt = 0;
    loop {
        let rows = load_stream_files(analyzer_runs_dir, stream, options)?;
        if !rows.is_empty() || attempt >= options.max_retries {
            return Ok(rows);
        }
        warn!(
            stream = stream.as_str(),
            attempt,
            "no rows loaded, retrying after transient-I/O backoff"
        );
        std::thread::sleep(options.retry_delay);
        attempt += 1;
    }
}

fn load_stream_files(
    analyzer_runs_dir: &Path,
    stream: &Stream,
    options: &LoadOptions,
) -> Result<Vec<AnalyzerRow>, IoError> {
    let files = monthly_files(analyzer_runs_dir, stream)?;
    let mut rows = Vec::new();

    for path in files {
        let mut df = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())
            .and_then(|lf| lf.collect())
            .map_err(|source| IoError::ReadParquet {
                path: path.clone(),
                source,
            })?;

        enforce_required_columns(&df, stream.as_str(), &path)?;
        enforce_trade_date_contract(
            &mut df,
            stream.as_str(),
            &path,
            options.allow_invalid_dates_salvage,
        )?;

        for idx in 0..df.height() {
            let row = row_from_dataframe(&df, idx, stream, &path)?;

            if let Some(specific) = options.specific_date {
                if row.trade_date != specific {
                    continue;
                }
            }
            if let Some(start) = options.start_date {
                if row.trade_date < start {
                    continue;
                }
            }
            if let Some(end) = options.end_date {
                if row.trade_date > end {
                    continue;
                }
            }

            rows.push(row);
        }
    }

    rows.sort_by_key(|row| row.trade_date);
    info!(stream = stream.as_str(), rows = rows.len(), "loaded stream data");
    Ok(rows)
}
