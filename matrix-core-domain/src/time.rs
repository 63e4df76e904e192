use crate::outcome::Outcome;
use crate::stream::Session;
use fnv::FnvHashMap;
use parking_lot::RwLock;
use std::sync::LazyLock;

/// Bounded rolling-history window size (§6.6): each canonical slot keeps the
/// last 13 scored trading days. Frozen; not configurable.
pub const ROLLING_WINDOW_SIZE: usize = 13;

/// Canonical time slots for session S1, in chronological order (§3.2).
pub const SLOT_ENDS_S1: &[&str] = &["07:30", "08:00", "09:00"];

/// Canonical time slots for session S2, in chronological order (§3.2).
pub const SLOT_ENDS_S2: &[&str] = &["09:30", "10:00", "10:30", "11:00"];

/// Look up the canonical slot table for a session. The single source of
/// truth every other crate reads from (§6.6 — "single source of truth" for
/// `SLOT_ENDS`, previously redefined three times in the original source).
pub const fn slot_ends(session: Session) -> &'static [&'static str] {
    match session {
        Session::S1 => SLOT_ENDS_S1,
        Session::S2 => SLOT_ENDS_S2,
    }
}

type TimeCache = RwLock<FnvHashMap<String, String>>;

static TIME_NORMALIZE_CACHE: LazyLock<TimeCache> = LazyLock::new(|| RwLock::new(FnvHashMap::default()));

/// Normalize a raw time string to `HH:MM`, zero-padded, whitespace trimmed.
///
/// Process-wide read-mostly cache (§9 "Caches"): repeated lookups of the
/// same raw string avoid re-parsing. Guarded by `parking_lot::RwLock` since
/// this is shared across the rayon worker pool (§5).
pub fn normalize_time(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(hit) = TIME_NORMALIZE_CACHE.read().get(trimmed) {
        return hit.clone();
    }

    let normalized = normalize_time_uncached(trimmed);
    TIME_NORMALIZE_CACHE
        .write()
        .insert(trimmed.to_string(), normalized.clone());
    normalized
}

fn normalize_time_uncached(trimmed: &str) -> String {
    let mut parts = trimmed.splitn(2, ':');
    let hour = parts.next().unwrap_or("0").trim();
    let minute = parts.next().unwrap_or("0").trim();

    let hour: u32 = hour.parse().unwrap_or(0);
    let minute: u32 = minute.parse().unwrap_or(0);

    format!("{hour:02}:{minute:02}")
}

/// Session a canonical time belongs to, defaulting to `S1` on a miss. Only
/// ever used where a default is provably safe (§4.1) — never to silently
/// merge a stream's own session with another's.
pub fn session_of(time: &str) -> Session {
    let normalized = normalize_time(time);
    if SLOT_ENDS_S2.contains(&normalized.as_str()) {
        Session::S2
    } else {
        Session::S1
    }
}

/// Score of a single day's result at a slot (§4.1): the asymmetric
/// `Win = +1, Loss = -2, else = 0` scoring function. This asymmetry is
/// load-bearing for the loss-triggered slot-switch decision (§4.7.2 step 2)
/// and must never be altered.
pub fn score_of(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Win => 1,
        Outcome::Loss => -2,
        Outcome::BreakEven | Outcome::NoTrade | Outcome::Other => 0,
    }
}

/// Chronological sort key for a canonical time string, so that sorts never
/// rely on lexical string order (which happens to coincide for `HH:MM` but
/// should not be relied upon implicitly).
pub fn time_sort_key(time: &str) -> (u32, u32) {
    let normalized = normalize_time(time);
    let mut parts = normalized.splitn(2, ':');
    let hour: u32 = parts.next().and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    (hour, minute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_zero_pads() {
        assert_eq!(normalize_time(" 7:30 "), "07:30");
        assert_eq!(normalize_time("09:00"), "09:00");
        assert_eq!(normalize_time("9:5"), "09:05");
    }

    #[test]
    fn session_lookup_matches_canonical_tables() {
        assert_eq!(session_of("07:30"), Session::S1);
        assert_eq!(session_of("11:00"), Session::S2);
        assert_eq!(session_of("23:59"), Session::S1);
    }

    #[test]
    fn score_asymmetry() {
        assert_eq!(score_of(Outcome::Win), 1);
        assert_eq!(score_of(Outcome::Loss), -2);
        assert_eq!(score_of(Outcome::BreakEven), 0);
        assert_eq!(score_of(Outcome::NoTrade), 0);
    }

    #[test]
    fn sort_key_is_chronological_not_lexical() {
        let mut times = vec!["11:00", "07:30", "09:00", "08:00"];
        times.sort_by_key(|t| time_sort_key(t));
        assert_eq!(times, vec!["07:30", "08:00", "09:00", "11:00"]);
    }
}
