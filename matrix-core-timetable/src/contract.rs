use matrix_core_domain::{Session, Stream};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The complete execution contract (§4.12): all twelve canonical streams
/// must appear in a timetable, even when blocked. Instrument roots are
/// frozen alongside `SLOT_ENDS` and `DOM_BLOCKED_DAYS` (§6.6).
pub const CANONICAL_INSTRUMENTS: &[&str] = &["ES", "GC", "CL", "NQ", "NG", "YM"];

/// Every `{instrument}{1|2}` combination, in a fixed, deterministic order.
pub fn canonical_streams() -> Vec<Stream> {
    let mut out = Vec::with_capacity(CANONICAL_INSTRUMENTS.len() * 2);
    for instrument in CANONICAL_INSTRUMENTS {
        for digit in ['1', '2'] {
            out.push(Stream::parse(&format!("{instrument}{digit}")).expect("canonical stream id is well-formed"));
        }
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableStreamEntry {
    pub stream: Stream,
    pub instrument: SmolStr,
    pub session: Session,
    pub slot_time: SmolStr,
    pub decision_time: SmolStr,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<SmolStr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timetable {
    pub as_of: String,
    pub trading_date: String,
    pub timezone: SmolStr,
    pub source: SmolStr,
    pub streams: Vec<TimetableStreamEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_has_exactly_twelve_streams() {
        let streams = canonical_streams();
        assert_eq!(streams.len(), 12);
        assert!(streams.iter().any(|s| s.as_str() == "ES1"));
        assert!(streams.iter().any(|s| s.as_str() == "YM2"));
    }
}
