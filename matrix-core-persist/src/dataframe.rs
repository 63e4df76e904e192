use crate::error::PersistError;
use chrono::NaiveDate;
use matrix_core_domain::time::{SLOT_ENDS_S1, SLOT_ENDS_S2};
use matrix_core_domain::ChosenRow;
use polars::prelude::*;
use std::path::Path;

/// Every canonical slot across both sessions, S1 first then S2 (§6.6). The
/// master matrix is one columnar file spanning every stream, so its schema
/// needs the union of both sessions' `"<slot> Points"`/`"<slot> Rolling"`
/// pairs — a row only populates the pair for its own session, leaving the
/// other session's columns null.
fn all_slots() -> Vec<&'static str> {
    SLOT_ENDS_S1.iter().chain(SLOT_ENDS_S2.iter()).copied().collect()
}

fn decimal_to_f64(value: rust_decimal::Decimal) -> f64 {
    value.try_into().unwrap_or(f64::NAN)
}

fn opt_decimal_to_f64(value: Option<rust_decimal::Decimal>) -> Option<f64> {
    value.map(decimal_to_f64)
}

/// Build the master matrix `DataFrame` from chosen rows, in the deterministic
/// column order the matrix file (C13) and timetable builder (C12) both read
/// (§6.2). Rows are expected to already be in their final canonical order
/// (§3.3 I2) — this function does not sort.
pub fn rows_to_dataframe(rows: &[ChosenRow]) -> Result<DataFrame, PersistError> {
    let slots = all_slots();

    let trade_date: Vec<i32> = rows
        .iter()
        .map(|r| (r.trade_date - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32)
        .collect();

    let mut columns = vec![
        Column::new(
            "trade_date".into(),
            Series::new("trade_date".into(), trade_date)
                .cast(&DataType::Date)
                .map_err(|source| PersistError::Parquet {
                    path: Path::new("<in-memory>").to_path_buf(),
                    source,
                })?
                .take_materialized_series(),
        ),
        Column::new(
            "Stream".into(),
            rows.iter().map(|r| r.stream.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Instrument".into(),
            rows.iter().map(|r| r.instrument.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Session".into(),
            rows.iter().map(|r| r.session.to_string()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Direction".into(),
            rows.iter()
                .map(|r| r.direction.map(|d| d.to_string()))
                .collect::<StringChunked>()
                .into_series(),
        ),
        Column::new(
            "Result".into(),
            rows.iter().map(|r| r.result.to_string()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Profit".into(),
            rows.iter().map(|r| decimal_to_f64(r.profit)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "Profit ($)".into(),
            rows.iter()
                .map(|r| decimal_to_f64(r.profit_dollars))
                .collect::<Float64Chunked>()
                .into_series(),
        ),
        Column::new(
            "Target".into(),
            rows.iter().map(|r| decimal_to_f64(r.target)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "Range".into(),
            rows.iter().map(|r| decimal_to_f64(r.range)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "Peak".into(),
            rows.iter().map(|r| decimal_to_f64(r.peak)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "Stop Loss".into(),
            rows.iter()
                .map(|r| opt_decimal_to_f64(r.stop_loss))
                .collect::<Float64Chunked>()
                .into_series(),
        ),
        Column::new(
            "SCF_S1".into(),
            rows.iter().map(|r| opt_decimal_to_f64(r.scf_s1)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "SCF_S2".into(),
            rows.iter().map(|r| opt_decimal_to_f64(r.scf_s2)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "Time".into(),
            rows.iter().map(|r| r.time.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Actual Trade Time".into(),
            rows.iter()
                .map(|r| r.actual_trade_time.as_str())
                .collect::<StringChunked>()
                .into_series(),
        ),
        Column::new(
            "Time Change".into(),
            rows.iter()
                .map(|r| r.time_change.as_deref())
                .collect::<StringChunked>()
                .into_series(),
        ),
        Column::new(
            "SL".into(),
            rows.iter().map(|r| decimal_to_f64(r.sl)).collect::<Float64Chunked>().into_series(),
        ),
    ];

    for slot in &slots {
        let points_name = format!("{slot} Points");
        let rolling_name = format!("{slot} Rolling");
        columns.push(Column::new(
            points_name.clone().into(),
            rows.iter()
                .map(|r| r.slot_points.get(*slot).copied())
                .collect::<Int32Chunked>()
                .into_series(),
        ));
        columns.push(Column::new(
            rolling_name.clone().into(),
            rows.iter()
                .map(|r| r.slot_rolling.get(*slot).copied())
                .collect::<Int32Chunked>()
                .into_series(),
        ));
    }

    columns.extend([
        Column::new(
            "Day of Month".into(),
            rows.iter().map(|r| r.day_of_month).collect::<UInt32Chunked>().into_series(),
        ),
        Column::new(
            "DOW".into(),
            rows.iter().map(|r| r.dow).collect::<UInt32Chunked>().into_series(),
        ),
        Column::new(
            "DOW Full".into(),
            rows.iter().map(|r| r.dow_full.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Month".into(),
            rows.iter().map(|r| r.month).collect::<UInt32Chunked>().into_series(),
        ),
        Column::new(
            "Session Index".into(),
            rows.iter().map(|r| r.session_index as u32).collect::<UInt32Chunked>().into_series(),
        ),
        Column::new(
            "Is Two Stream".into(),
            rows.iter().map(|r| r.is_two_stream).collect::<BooleanChunked>().into_series(),
        ),
        Column::new(
            "DOM Blocked".into(),
            rows.iter().map(|r| r.dom_blocked).collect::<BooleanChunked>().into_series(),
        ),
        Column::new(
            "Filter Reasons".into(),
            rows.iter()
                .map(|r| r.filter_reasons.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(","))
                .collect::<StringChunked>()
                .into_series(),
        ),
        Column::new(
            "Final Allowed".into(),
            rows.iter().map(|r| r.final_allowed).collect::<BooleanChunked>().into_series(),
        ),
        Column::new(
            "Global Trade ID".into(),
            rows.iter().map(|r| r.global_trade_id).collect::<UInt64Chunked>().into_series(),
        ),
        Column::new(
            "Entry Time".into(),
            rows.iter().map(|r| r.entry_time.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Exit Time".into(),
            rows.iter().map(|r| r.exit_time.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Entry Price".into(),
            rows.iter()
                .map(|r| opt_decimal_to_f64(r.entry_price))
                .collect::<Float64Chunked>()
                .into_series(),
        ),
        Column::new(
            "Exit Price".into(),
            rows.iter()
                .map(|r| opt_decimal_to_f64(r.exit_price))
                .collect::<Float64Chunked>()
                .into_series(),
        ),
        Column::new(
            "R".into(),
            rows.iter().map(|r| opt_decimal_to_f64(r.r)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "PnL".into(),
            rows.iter().map(|r| decimal_to_f64(r.pnl)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "RS Value".into(),
            rows.iter().map(|r| opt_decimal_to_f64(r.rs_value)).collect::<Float64Chunked>().into_series(),
        ),
        Column::new(
            "Selected Time".into(),
            rows.iter().map(|r| r.selected_time.as_str()).collect::<StringChunked>().into_series(),
        ),
        Column::new(
            "Time Bucket".into(),
            rows.iter().map(|r| r.time_bucket.as_str()).collect::<StringChunked>().into_series(),
        ),
    ]);

    DataFrame::new(columns).map_err(|source| PersistError::Parquet {
        path: Path::new("<in-memory>").to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_core_domain::{Direction, Outcome, Session, Stream};
    use rust_decimal::Decimal;
    use smol_str::SmolStr;

    fn sample_row() -> ChosenRow {
        ChosenRow {
            trade_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            stream: Stream::parse("ES1").unwrap(),
            instrument: SmolStr::new("ES"),
            session: Session::S1,
            direction: Some(Direction::Long),
            result: Outcome::Win,
            profit: Decimal::ONE,
            profit_dollars: Decimal::from(50),
            target: Decimal::ONE,
            range: Decimal::from(2),
            peak: Decimal::ZERO,
            stop_loss: None,
            scf_s1: None,
            scf_s2: None,
            time: SmolStr::new("08:00"),
            actual_trade_time: SmolStr::new("08:00"),
            time_change: None,
            sl: ChosenRow::compute_sl(Decimal::ONE, Decimal::from(2)),
            slot_points: Default::default(),
            slot_rolling: Default::default(),
            day_of_month: 5,
            dow: 0,
            dow_full: SmolStr::new("Monday"),
            month: 1,
            session_index: 0,
            is_two_stream: false,
            dom_blocked: false,
            filter_reasons: vec![],
            final_allowed: true,
            global_trade_id: Some(1),
            entry_time: SmolStr::new("08:00"),
            exit_time: SmolStr::new(""),
            entry_price: None,
            exit_price: None,
            r: None,
            pnl: Decimal::ONE,
            rs_value: None,
            selected_time: SmolStr::new("08:00"),
            time_bucket: SmolStr::new("morning"),
        }
    }

    #[test]
    fn builds_dataframe_with_union_slot_columns() {
        let df = rows_to_dataframe(&[sample_row()]).unwrap();
        assert_eq!(df.height(), 1);
        assert!(df.get_column_names().iter().any(|n| n.as_str() == "07:30 Points"));
        assert!(df.get_column_names().iter().any(|n| n.as_str() == "11:00 Rolling"));
    }
}
