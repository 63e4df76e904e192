use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering streams or loading analyzer data (C2/C3).
#[derive(Debug, Error)]
pub enum IoError {
    #[error("analyzer_runs_dir '{0}' does not exist or is not a directory")]
    RootMissing(PathBuf),

    #[error("failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read parquet file '{path}': {source}")]
    ReadParquet {
        path: PathBuf,
        #[source]
        source: polars::prelude::PolarsError,
    },

    #[error(
        "Tier-0 contract violation: stream '{stream}' is missing required column '{column}' \
         in file '{path}'"
    )]
    MissingColumn {
        stream: String,
        path: PathBuf,
        column: String,
    },

    #[error(
        "Tier-0 contract violation: stream '{stream}' has {invalid_count} row(s) with invalid \
         trade_date in '{path}', first samples: {samples:?}"
    )]
    InvalidTradeDate {
        stream: String,
        path: PathBuf,
        invalid_count: usize,
        samples: Vec<String>,
    },

    #[error("critical stream '{0}' produced no usable rows after {1} retries")]
    MissingCriticalStream(String, u32),

    #[error("invalid stream id encountered during discovery: {0}")]
    Domain(#[from] matrix_core_domain::DomainError),
}
