use crate::contract::any_value_to_date;
use crate::error::IoError;
use matrix_core_domain::{AnalyzerRow, Direction, Outcome, Session, Stream};
use polars::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use smol_str::SmolStr;
use std::path::Path;

fn get(df: &DataFrame, column: &str, idx: usize, path: &Path) -> Result<AnyValue<'static>, IoError> {
    df.column(column)
        .and_then(|series| series.get(idx).map(|v| v.into_static()))
        .map_err(|source| IoError::ReadParquet {
            path: path.to_path_buf(),
            source,
        })
}

fn as_string(value: &AnyValue<'_>) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Null => String::new(),
        other => format!("{other}"),
    }
}

fn as_decimal(value: &AnyValue<'_>) -> Decimal {
    match value {
        AnyValue::Float64(f) => Decimal::from_f64(*f).unwrap_or_default(),
        AnyValue::Float32(f) => Decimal::from_f64(*f as f64).unwrap_or_default(),
        AnyValue::Int64(i) => Decimal::from(*i),
        AnyValue::Int32(i) => Decimal::from(*i),
        AnyValue::Null => Decimal::ZERO,
        _ => Decimal::ZERO,
    }
}

fn as_opt_decimal(value: &AnyValue<'_>) -> Option<Decimal> {
    if matches!(value, AnyValue::Null) {
        None
    } else {
        Some(as_decimal(value))
    }
}

/// Convert one row of an already contract-validated [`DataFrame`] into an
/// [`AnalyzerRow`] (§6.1).
///
/// `filename_stream` is the stream parsed from the containing directory
/// name; it repairs a missing/blank `Stream` column (§4.3 — the analyzer
/// guarantees a `Stream` column only when dedup across instruments needs
/// it, otherwise the directory layout is the source of truth).
pub fn row_from_dataframe(
    df: &DataFrame,
    idx: usize,
    filename_stream: &Stream,
    path: &Path,
) -> Result<AnalyzerRow, IoError> {
    let date_value = get(df, "Date", idx, path)?;
    let trade_date = any_value_to_date(&date_value).ok_or_else(|| IoError::InvalidTradeDate {
        stream: filename_stream.as_str().to_string(),
        path: path.to_path_buf(),
        invalid_count: 1,
        samples: vec![format!("{date_value:?}")],
    })?;

    let time = SmolStr::new(as_string(&get(df, "Time", idx, path)?));
    let session_raw = as_string(&get(df, "Session", idx, path)?);
    let session = if session_raw.eq_ignore_ascii_case("S2") {
        Session::S2
    } else {
        Session::S1
    };

    let stream = match df.column("Stream") {
        Ok(series) => {
            let raw = as_string(&series.get(idx).map(|v| v.into_static()).unwrap_or(AnyValue::Null));
            if raw.trim().is_empty() {
                filename_stream.clone()
            } else {
                Stream::parse(&raw).unwrap_or_else(|_| filename_stream.clone())
            }
        }
        Err(_) => filename_stream.clone(),
    };

    let instrument = SmolStr::new(as_string(&get(df, "Instrument", idx, path)?));

    let direction_raw = as_string(&get(df, "Direction", idx, path)?);
    let direction = match direction_raw.as_str() {
        "Long" => Some(Direction::Long),
        "Short" => Some(Direction::Short),
        _ => None,
    };

    let result = Outcome::parse(&as_string(&get(df, "Result", idx, path)?));

    let profit = as_decimal(&get(df, "Profit", idx, path)?);
    let target = as_decimal(&get(df, "Target", idx, path)?);
    let range = as_decimal(&get(df, "Range", idx, path)?);
    let peak = as_decimal(&get(df, "Peak", idx, path)?);

    let stop_loss = df
        .column("StopLoss")
        .ok()
        .and_then(|s| s.get(idx).ok())
        .map(|v| v.into_static())
        .and_then(|v| as_opt_decimal(&v));
    let scf_s1 = df
        .column("scf_s1")
        .ok()
        .and_then(|s| s.get(idx).ok())
        .map(|v| v.into_static())
        .and_then(|v| as_opt_decimal(&v));
    let scf_s2 = df
        .column("scf_s2")
        .ok()
        .and_then(|s| s.get(idx).ok())
        .map(|v| v.into_static())
        .and_then(|v| as_opt_decimal(&v));
    let onr = df
        .column("onr")
        .ok()
        .and_then(|s| s.get(idx).ok())
        .map(|v| v.into_static())
        .and_then(|v| as_opt_decimal(&v));
    let onr_high = df
        .column("onr_high")
        .ok()
        .and_then(|s| s.get(idx).ok())
        .map(|v| v.into_static())
        .and_then(|v| as_opt_decimal(&v));
    let onr_low = df
        .column("onr_low")
        .ok()
        .and_then(|s| s.get(idx).ok())
        .map(|v| v.into_static())
        .and_then(|v| as_opt_decimal(&v));

    Ok(AnalyzerRow {
        trade_date,
        time,
        stream,
        instrument,
        session,
        direction,
        result,
        profit,
        target,
        range,
        peak,
        stop_loss,
        scf_s1,
        scf_s2,
        onr,
        onr_high,
        onr_low,
    })
}
