use matrix_core_domain::ChosenRow;
use rust_decimal::Decimal;

/// Defensively (re-)derive `profit_dollars = profit * contract_multiplier`
/// (§4.10) before the filter engine runs, since its stream-health gating
/// depends on the column being present. Idempotent: safe to call even when
/// the sequencer already populated a placeholder value.
pub fn normalize_schema(rows: &mut [ChosenRow], contract_multiplier: Decimal) {
    for row in rows.iter_mut() {
        row.profit_dollars = row.profit * contract_multiplier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use matrix_core_domain::{Outcome, Session, Stream};
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn row(profit: Decimal) -> ChosenRow {
        ChosenRow {
            trade_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            stream: Stream::parse("ES1").unwrap(),
            instrument: SmolStr::new("ES"),
            session: Session::S1,
            direction: None,
            result: Outcome::Win,
            profit,
            profit_dollars: Decimal::ZERO,
            target: dec!(1),
            range: dec!(1),
            peak: Decimal::ZERO,
            stop_loss: None,
            scf_s1: None,
            scf_s2: None,
            time: SmolStr::new("07:30"),
            actual_trade_time: SmolStr::new("07:30"),
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

    #[test]
    fn applies_contract_multiplier() {
        let mut rows = vec![row(dec!(2))];
        normalize_schema(&mut rows, dec!(50));
        assert_eq!(rows[0].profit_dollars, dec!(100));
    }
}
