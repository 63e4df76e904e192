use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Outcome of a single trade row, as reported by the analyzer.
///
/// `Other` is a deliberate catch-all: the analyzer's `Result` column is
/// free text in practice (eg/ partial-fill annotations), and anything that
/// isn't exactly `Win`/`Loss`/`BreakEven`/`NoTrade` scores as zero (§4.1)
/// rather than being rejected.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
pub enum Outcome {
    #[display("Win")]
    #[serde(alias = "Win", alias = "WIN", alias = "win")]
    Win,
    #[display("Loss")]
    #[serde(alias = "Loss", alias = "LOSS", alias = "loss")]
    Loss,
    #[display("BE")]
    #[serde(alias = "BE", alias = "BreakEven", alias = "break_even")]
    BreakEven,
    #[display("NoTrade")]
    #[serde(alias = "NoTrade", alias = "no_trade")]
    NoTrade,
    #[serde(other)]
    #[display("Other")]
    Other,
}

impl Outcome {
    /// Parse a raw analyzer `Result` string, never failing: unrecognized
    /// values become [`Outcome::Other`] rather than an error, matching the
    /// "everything else scores zero" design of §4.1.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Win" | "WIN" | "win" => Outcome::Win,
            "Loss" | "LOSS" | "loss" => Outcome::Loss,
            "BE" | "BreakEven" | "break_even" => Outcome::BreakEven,
            "NoTrade" | "no_trade" => Outcome::NoTrade,
            _ => Outcome::Other,
        }
    }
}
