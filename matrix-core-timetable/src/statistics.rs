use indexmap::IndexMap;
use matrix_core_domain::{ChosenRow, Outcome, Stream};
use rust_decimal::Decimal;
use tracing::info;

/// Per-stream or whole-run win/loss/profit breakdown (C14, supplemental).
///
/// Purely an operator-facing build report: nothing downstream reads it
/// back, so this is a plain return value plus an `info`-level log line,
/// never a persisted artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_evens: usize,
    pub no_trades: usize,
    pub win_rate: Decimal,
    pub total_profit: Decimal,
    pub average_profit: Decimal,
    pub risk_reward_ratio: Decimal,
    pub allowed_count: usize,
    pub blocked_count: usize,
}

impl SummaryStatistics {
    fn compute(rows: &[ChosenRow]) -> Self {
        let total_trades = rows.len();
        let wins = rows.iter().filter(|r| r.result == Outcome::Win).count();
        let losses = rows.iter().filter(|r| r.result == Outcome::Loss).count();
        let break_evens = rows.iter().filter(|r| r.result == Outcome::BreakEven).count();
        let no_trades = rows.iter().filter(|r| r.result == Outcome::NoTrade).count();

        let win_rate = if wins + losses > 0 {
            Decimal::from(wins) / Decimal::from(wins + losses)
        } else {
            Decimal::ZERO
        };

        let total_profit: Decimal = rows.iter().map(|r| r.profit).sum();
        let average_profit = if total_trades > 0 {
            total_profit / Decimal::from(total_trades)
        } else {
            Decimal::ZERO
        };

        let win_profits: Vec<Decimal> = rows.iter().filter(|r| r.result == Outcome::Win).map(|r| r.profit).collect();
        let loss_profits: Vec<Decimal> = rows.iter().filter(|r| r.result == Outcome::Loss).map(|r| r.profit).collect();

        let average_win = if win_profits.is_empty() {
            Decimal::ZERO
        } else {
            win_profits.iter().sum::<Decimal>() / Decimal::from(win_profits.len())
        };
        let average_loss_abs = if loss_profits.is_empty() {
            Decimal::ZERO
        } else {
            (loss_profits.iter().sum::<Decimal>() / Decimal::from(loss_profits.len())).abs()
        };

        let risk_reward_ratio = if average_loss_abs.is_zero() {
            if average_win.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::MAX
            }
        } else {
            average_win / average_loss_abs
        };

        let allowed_count = rows.iter().filter(|r| r.final_allowed).count();
        let blocked_count = total_trades - allowed_count;

        Self {
            total_trades,
            wins,
            losses,
            break_evens,
            no_trades,
            win_rate,
            total_profit,
            average_profit,
            risk_reward_ratio,
            allowed_count,
            blocked_count,
        }
    }
}

/// Compute and log (at `info`, §4.14) the whole-run summary plus a
/// per-stream breakdown. Called after every successful full rebuild,
/// partial rebuild, or rolling resequence.
pub fn log_summary(rows: &[ChosenRow]) -> (SummaryStatistics, IndexMap<Stream, SummaryStatistics>) {
    let overall = SummaryStatistics::compute(rows);
    info!(
        total_trades = overall.total_trades,
        wins = overall.wins,
        losses = overall.losses,
        break_evens = overall.break_evens,
        no_trades = overall.no_trades,
        win_rate = %overall.win_rate,
        total_profit = %overall.total_profit,
        average_profit = %overall.average_profit,
        risk_reward_ratio = %overall.risk_reward_ratio,
        allowed = overall.allowed_count,
        blocked = overall.blocked_count,
        "matrix build summary"
    );

    let mut per_stream: IndexMap<Stream, SummaryStatistics> = IndexMap::new();
    let mut by_stream: IndexMap<Stream, Vec<ChosenRow>> = IndexMap::new();
    for row in rows {
        by_stream.entry(row.stream.clone()).or_default().push(row.clone());
    }
    for (stream, stream_rows) in by_stream {
        let stats = SummaryStatistics::compute(&stream_rows);
        info!(
            stream = stream.as_str(),
            total_trades = stats.total_trades,
            win_rate = %stats.win_rate,
            total_profit = %stats.total_profit,
            allowed = stats.allowed_count,
            blocked = stats.blocked_count,
            "per-stream build summary"
        );
        per_stream.insert(stream, stats);
    }

    (overall, per_stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use matrix_core_domain::{Direction, Session};
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn row(stream: &str, result: Outcome, profit: Decimal, final_allowed: bool) -> ChosenRow {
        ChosenRow {
            trade_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            stream: Stream::parse(stream).unwrap(),
            instrument: SmolStr::new(&stream[..stream.len() - 1]),
            session: Session::S1,
            direction: Some(Direction::Long),
            result,
            profit,
            profit_dollars: profit,
            target: Decimal::ONE,
            range: Decimal::ONE,
            peak: Decimal::ZERO,
            stop_loss: None,
            scf_s1: None,
            scf_s2: None,
            time: SmolStr::new("07:30"),
            actual_trade_time: SmolStr::new("07:30"),
            time_change: None,
            sl: Decimal::ONE,
            slot_points: IndexMap::new(),
            slot_rolling: IndexMap::new(),
            day_of_month: 5,
            dow: 0,
            dow_full: SmolStr::new("Monday"),
            month: 1,
            session_index: 1,
            is_two_stream: false,
            dom_blocked: false,
            filter_reasons: Vec::new(),
            final_allowed,
            global_trade_id: Some(1),
            entry_time: SmolStr::new("07:30"),
            exit_time: SmolStr::new("07:30"),
            entry_price: None,
            exit_price: None,
            r: None,
            pnl: profit,
            rs_value: None,
            selected_time: SmolStr::new("07:30"),
            time_bucket: SmolStr::new("S1"),
        }
    }

    #[test]
    fn win_rate_excludes_break_even() {
        let rows = vec![
            row("ES1", Outcome::Win, dec!(10), true),
            row("ES1", Outcome::Loss, dec!(-5), true),
            row("ES1", Outcome::BreakEven, dec!(0), true),
        ];
        let (overall, _) = log_summary(&rows);
        assert_eq!(overall.win_rate, Decimal::ONE / Decimal::from(2));
    }

    #[test]
    fn risk_reward_zero_with_no_wins() {
        let rows = vec![row("ES1", Outcome::Loss, dec!(-5), true)];
        let (overall, _) = log_summary(&rows);
        assert_eq!(overall.risk_reward_ratio, Decimal::ZERO);
    }

    #[test]
    fn allowed_and_blocked_counts_split_on_final_allowed() {
        let rows = vec![
            row("ES1", Outcome::Win, dec!(10), true),
            row("ES1", Outcome::Win, dec!(10), false),
        ];
        let (overall, per_stream) = log_summary(&rows);
        assert_eq!(overall.allowed_count, 1);
        assert_eq!(overall.blocked_count, 1);
        assert_eq!(per_stream.len(), 1);
    }
}
