use crate::error::IoError;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tracing::{error, warn};

/// Required columns on analyzer input (§6.1).
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Date", "Time", "Session", "Instrument", "Direction", "Result", "Target", "Range", "Peak",
    "Profit",
];

/// Enforce I1 / §4.3: `trade_date` (the `Date` column) must be a valid
/// datetime column. Missing column is a hard, non-repairable abort. Wrong
/// dtype gets one repair attempt via cast-to-date; repair failure aborts.
/// Invalid individual values abort unless salvage mode drops and re-logs
/// them.
pub fn enforce_trade_date_contract(
    df: &mut DataFrame,
    stream: &str,
    path: &Path,
    allow_invalid_dates_salvage: bool,
) -> Result<(), IoError> {
    if df.column("Date").is_err() {
        return Err(IoError::MissingColumn {
            stream: stream.to_string(),
            path: path.to_path_buf(),
            column: "Date".to_string(),
        });
    }

    let needs_repair = !matches!(
        df.column("Date").unwrap().dtype(),
        DataType::Date | DataType::Datetime(_, _)
    );

    if needs_repair {
        warn!(stream, path = %path.display(), "Date column has unexpected dtype; attempting one-shot repair");
        let repaired = df
            .column("Date")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Date)
            .map_err(|source| IoError::ReadParquet {
                path: path.to_path_buf(),
                source,
            })?;
        df.with_column(repaired).map_err(|source| IoError::ReadParquet {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let null_count = df.column("Date").unwrap().null_count();
    if null_count > 0 {
        if allow_invalid_dates_salvage {
            warn!(
                stream,
                path = %path.display(),
                null_count,
                "dropping rows with invalid trade_date (ALLOW_INVALID_DATES_SALVAGE set)"
            );
            let mask = df.column("Date").unwrap().as_materialized_series().is_not_null();
            *df = df.filter(&mask).map_err(|source| IoError::ReadParquet {
                path: path.to_path_buf(),
                source,
            })?;
        } else {
            let samples: Vec<String> = df
                .column("Date")
                .unwrap()
                .as_materialized_series()
                .iter()
                .filter(|value| matches!(value, AnyValue::Null))
                .take(5)
                .map(|value| format!("{value:?}"))
                .collect();

            error!(stream, path = %path.display(), null_count, ?samples, "Tier-0 contract violation: invalid trade_date");
            return Err(IoError::InvalidTradeDate {
                stream: stream.to_string(),
                path: path.to_path_buf(),
                invalid_count: null_count,
                samples,
            });
        }
    }

    Ok(())
}

/// Verify every column in [`REQUIRED_COLUMNS`] is present.
pub fn enforce_required_columns(df: &DataFrame, stream: &str, path: &Path) -> Result<(), IoError> {
    for column in REQUIRED_COLUMNS {
        if df.column(column).is_err() {
            return Err(IoError::MissingColumn {
                stream: stream.to_string(),
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Parse a `"YYYY-MM-DD"`-ish value out of an `AnyValue::Date`/`Datetime`.
pub fn any_value_to_date(value: &AnyValue) -> Option<NaiveDate> {
    match value {
        AnyValue::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(*days as i64))),
        AnyValue::Datetime(ms, _, _) => {
            chrono::DateTime::from_timestamp_millis(*ms).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}
