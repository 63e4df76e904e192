use crate::outcome::Outcome;
use crate::stream::{Session, Stream};
use chrono::NaiveDate;
use derive_more::Display;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Trade direction, as reported by the analyzer. `None` covers `NoTrade`
/// rows and any row where direction genuinely wasn't recorded.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
pub enum Direction {
    #[display("Long")]
    Long,
    #[display("Short")]
    Short,
}

/// One row of analyzer output (§3.1, §6.1): one instrument, one trading
/// day, one canonical time slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerRow {
    pub trade_date: NaiveDate,
    pub time: SmolStr,
    pub stream: Stream,
    pub instrument: SmolStr,
    pub session: Session,
    pub direction: Option<Direction>,
    pub result: Outcome,
    pub profit: Decimal,
    pub target: Decimal,
    pub range: Decimal,
    pub peak: Decimal,
    pub stop_loss: Option<Decimal>,
    pub scf_s1: Option<Decimal>,
    pub scf_s2: Option<Decimal>,
    pub onr: Option<Decimal>,
    pub onr_high: Option<Decimal>,
    pub onr_low: Option<Decimal>,
}

/// The row the sequencer emits for a `(stream, trading day)` pair (§3.1).
///
/// `time` is the sequencer's authoritative slot (§3.3 I3); `actual_trade_time`
/// preserves whatever the analyzer originally reported at that slot (empty
/// string on a `NoTrade` day, §4.7.2 step 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenRow {
    pub trade_date: NaiveDate,
    pub stream: Stream,
    pub instrument: SmolStr,
    pub session: Session,
    pub direction: Option<Direction>,
    pub result: Outcome,
    pub profit: Decimal,
    pub profit_dollars: Decimal,
    pub target: Decimal,
    pub range: Decimal,
    pub peak: Decimal,
    pub stop_loss: Option<Decimal>,
    pub scf_s1: Option<Decimal>,
    pub scf_s2: Option<Decimal>,

    /// The sequencer's authoritative slot for this day (§3.3 I3).
    pub time: SmolStr,
    /// The analyzer's original time at this slot, `""` on a `NoTrade` day.
    pub actual_trade_time: SmolStr,
    /// Display-only transition indicator (§4.7.2 step 5); never read by
    /// anything that needs the authoritative slot.
    pub time_change: Option<SmolStr>,

    /// `SL = min(3 * target, range)` (§3.1).
    pub sl: Decimal,

    /// Per-canonical-slot `"<slot> Points"` and `"<slot> Rolling"` pairs
    /// (§3.1, §9 "dynamic extra columns"), keyed by normalized slot string.
    pub slot_points: IndexMap<SmolStr, i32>,
    pub slot_rolling: IndexMap<SmolStr, i32>,

    // --- Filter Engine (C4) derived fields ---
    pub day_of_month: u32,
    pub dow: u32,
    pub dow_full: SmolStr,
    pub month: u32,
    pub session_index: u8,
    pub is_two_stream: bool,
    pub dom_blocked: bool,
    pub filter_reasons: Vec<SmolStr>,
    pub final_allowed: bool,

    /// Assigned only after the canonical sort (§3.3 I2); `None` until then.
    pub global_trade_id: Option<u64>,

    // --- supplemental derived/display columns (SPEC_FULL §2.1) ---
    pub entry_time: SmolStr,
    pub exit_time: SmolStr,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    /// `Profit / Target`, guarded against division by zero. Optional per
    /// Open Question O3 (SPEC_FULL §9): never required by any invariant.
    pub r: Option<Decimal>,
    pub pnl: Decimal,
    pub rs_value: Option<Decimal>,
    pub selected_time: SmolStr,
    pub time_bucket: SmolStr,
}

impl ChosenRow {
    /// `SL = min(3 * target, range)` (§3.1).
    pub fn compute_sl(target: Decimal, range: Decimal) -> Decimal {
        (target * Decimal::from(3)).min(range)
    }
}
