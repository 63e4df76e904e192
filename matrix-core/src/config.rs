use crate::error::MatrixError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use matrix_core_domain::{Stream, StreamConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `DOM_BLOCKED_DAYS` (§6.6): frozen constant, not a configuration default a
/// caller is expected to change — surfaced here only so [`MatrixConfig::default`]
/// can seed it.
const DOM_BLOCKED_DAYS: [u32; 3] = [4, 16, 30];

/// `MATRIX_REPROCESS_TRADING_DAYS` default (§6.6); `40` is accepted as an
/// alternate by callers that override `resequence_days`.
const MATRIX_REPROCESS_TRADING_DAYS: u32 = 35;

/// Everything a caller needs to run a build or a rolling resequence (§6.6,
/// §6.7): the frozen constants of §6.6 are compiled in elsewhere
/// (`matrix_core_domain::time`, `DOM_BLOCKED_DAYS` above) — this struct only
/// ever carries the *operational* knobs the spec calls out (`max_retries`,
/// `retry_delay`, `resequence_days`, directory paths, stream filters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub analyzer_runs_dir: PathBuf,
    pub matrix_dir: PathBuf,
    pub checkpoints_dir: PathBuf,
    pub timetable_dir: PathBuf,
    pub run_history_path: PathBuf,

    /// Streams whose absence or emptiness aborts a build (§7, `CRITICAL_STREAMS`).
    pub critical_streams: Vec<String>,

    /// Per-stream DOW/DOM/time exclusions (§3.1, §6.6). Keyed by stream id
    /// string since TOML/JSON maps require string keys; resolved to
    /// [`Stream`] in [`MatrixConfig::resolved_critical_streams`] /
    /// [`MatrixConfig::resolved_stream_filters`].
    pub stream_filters: IndexMap<String, StreamConfig>,

    /// `profit_dollars = profit * contract_multiplier` (§4.10). Defaults to
    /// `1` (no scaling) since the spec does not fix a per-instrument value.
    pub contract_multiplier: Decimal,

    /// `DOM_BLOCKED_DAYS` (§6.6), overridable per deployment.
    pub dom_blocked_days: Vec<u32>,

    /// Default window size for [`crate::rolling_resequence`]
    /// (`MATRIX_REPROCESS_TRADING_DAYS`, §6.6).
    pub resequence_days: u32,

    /// Data-loader retry budget for transient I/O (§7 "I/O transient (recoverable)").
    pub max_retries: u32,
    pub retry_delay_ms: u64,

    /// `ALLOW_INVALID_DATES_SALVAGE` (§6.6); default `false` — an invalid
    /// `trade_date` is a Tier-0 fatal contract violation unless explicitly
    /// opted into best-effort salvage.
    pub allow_invalid_dates_salvage: bool,

    /// `MATRIX_CHECKPOINT_FREQUENCY` (§6.6, supplemental): an informational
    /// scheduling hint for callers deciding how often to invoke a full
    /// rebuild vs. a rolling resequence. The core itself never reads this
    /// field — it does not schedule anything (§1 out-of-scope).
    pub checkpoint_frequency: String,

    /// §6.7 `buildMasterMatrix` date-range overrides, applied by the data
    /// loader (C3) before the sequencer ever sees a row.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub specific_date: Option<NaiveDate>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            analyzer_runs_dir: PathBuf::from("analyzer_runs"),
            matrix_dir: PathBuf::from("data/matrix"),
            checkpoints_dir: PathBuf::from("state/checkpoints"),
            timetable_dir: PathBuf::from("data/timetable"),
            run_history_path: PathBuf::from("state/run_history.jsonl"),
            critical_streams: Vec::new(),
            stream_filters: IndexMap::new(),
            contract_multiplier: Decimal::ONE,
            dom_blocked_days: DOM_BLOCKED_DAYS.to_vec(),
            resequence_days: MATRIX_REPROCESS_TRADING_DAYS,
            max_retries: 2,
            retry_delay_ms: 500,
            allow_invalid_dates_salvage: false,
            checkpoint_frequency: "weekly".to_string(),
            start_date: None,
            end_date: None,
            specific_date: None,
        }
    }
}

impl MatrixConfig {
    /// Load from a TOML or JSON file, selected by extension (§0 "Configuration").
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MatrixError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path).map_err(|source| MatrixError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&body).map_err(|source| MatrixError::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML",
                source: source.to_string(),
            }),
            Some("json") => serde_json::from_str(&body).map_err(|source| MatrixError::ConfigParse {
                path: path.to_path_buf(),
                format: "JSON",
                source: source.to_string(),
            }),
            _ => Err(MatrixError::UnknownConfigFormat(path.to_path_buf())),
        }
    }

    /// Environment overrides read once, at construction time (§0
    /// "Configuration" — "read once at config-construction time, not
    /// scattered through the call graph").
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("ALLOW_INVALID_DATES_SALVAGE") {
            self.allow_invalid_dates_salvage = matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(raw) = std::env::var("MATRIX_CHECKPOINT_FREQUENCY") {
            self.checkpoint_frequency = raw;
        }
        self
    }

    pub(crate) fn resolved_critical_streams(&self) -> Result<HashSet<Stream>, MatrixError> {
        self.critical_streams
            .iter()
            .map(|raw| Stream::parse(raw).map_err(|err| MatrixError::InvalidConfiguredStream(raw.clone(), err)))
            .collect()
    }

    pub(crate) fn resolved_stream_filters(&self) -> Result<IndexMap<Stream, StreamConfig>, MatrixError> {
        self.stream_filters
            .iter()
            .map(|(raw, cfg)| {
                Stream::parse(raw)
                    .map(|stream| (stream, cfg.clone()))
                    .map_err(|err| MatrixError::InvalidConfiguredStream(raw.clone(), err))
            })
            .collect()
    }

    pub(crate) fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
