use crate::error::DomainError;
use crate::stream::Session;
use crate::time::{ROLLING_WINDOW_SIZE, normalize_time, slot_ends};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::VecDeque;

/// Bounded FIFO of the last [`ROLLING_WINDOW_SIZE`] scores for one canonical
/// slot (C5, §3.1). Oldest score is evicted once capacity is exceeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSlotHistory(VecDeque<i32>);

impl PerSlotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a score, evicting from the head if capacity is exceeded.
    /// Pure with respect to anything but `self` (§4.5).
    pub fn push(&mut self, score: i32) {
        self.0.push_back(score);
        while self.0.len() > ROLLING_WINDOW_SIZE {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> i32 {
        self.0.iter().sum()
    }

    pub fn scores(&self) -> impl Iterator<Item = &i32> {
        self.0.iter()
    }
}

/// Per-stream filter configuration (§3.1): the exclusion sets that narrow
/// `canonicalTimes` down to `selectableTimes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub exclude_days_of_week: Vec<SmolStr>,
    pub exclude_days_of_month: Vec<u32>,
    pub exclude_times: Vec<SmolStr>,
}

impl StreamConfig {
    /// `selectableTimes = canonicalTimes \ excludeTimes` (§3.1). Derived
    /// purely from `SLOT_ENDS` and this config — never from which rows are
    /// actually present for the stream (§4.6).
    pub fn selectable_times(&self, session: Session) -> Result<Vec<SmolStr>, DomainError> {
        let excluded: Vec<String> = self
            .exclude_times
            .iter()
            .map(|t| normalize_time(t))
            .collect();

        let selectable: Vec<SmolStr> = slot_ends(session)
            .iter()
            .map(|t| normalize_time(t))
            .filter(|t| !excluded.contains(t))
            .map(SmolStr::new)
            .collect();

        if selectable.is_empty() {
            Err(DomainError::EmptySelectableSlots {
                stream: format!("<{session}>"),
            })
        } else {
            Ok(selectable)
        }
    }
}

/// Full per-stream sequencer state (§3.1): the current slot, the session it
/// implies, and the per-slot rolling histories across all canonical slots
/// for that session. This is exactly what a [`Checkpoint`](crate) persists
/// and what the rolling resequence engine restores (§4.11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    pub current_time: SmolStr,
    pub current_session: Session,
    pub histories: IndexMap<SmolStr, PerSlotHistory>,
}

impl SequencerState {
    /// Fresh state for a stream that has never been processed: current slot
    /// is the first selectable slot, all histories empty (§4.7.1).
    pub fn initial(session: Session, selectable_times: &[SmolStr]) -> Self {
        let current_time = selectable_times
            .first()
            .cloned()
            .unwrap_or_else(|| SmolStr::new(slot_ends(session)[0]));

        let histories = slot_ends(session)
            .iter()
            .map(|t| (SmolStr::new(normalize_time(t)), PerSlotHistory::new()))
            .collect();

        Self {
            current_time,
            current_session: session,
            histories,
        }
    }

    /// Restore from a checkpoint, falling back to the first selectable slot
    /// with a caller-surfaced warning if the checkpointed slot is no longer
    /// selectable (§4.7.1). Missing canonical slots get a fresh, empty
    /// history rather than failing.
    pub fn restore(
        mut restored: SequencerState,
        selectable_times: &[SmolStr],
    ) -> (Self, bool) {
        let mut fell_back = false;
        if !selectable_times.contains(&restored.current_time) {
            fell_back = true;
            if let Some(first) = selectable_times.first() {
                restored.current_time = first.clone();
                restored.current_session = crate::time::session_of(first.as_str());
            }
        }

        for slot in slot_ends(restored.current_session) {
            let key = SmolStr::new(normalize_time(slot));
            restored.histories.entry(key).or_insert_with(PerSlotHistory::new);
        }

        (restored, fell_back)
    }

    pub fn history_lengths(&self) -> Vec<(String, usize)> {
        self.histories
            .iter()
            .map(|(slot, hist)| (slot.to_string(), hist.len()))
            .collect()
    }

    /// I5: all canonical slots for this stream's session must carry
    /// equal-length histories.
    pub fn histories_uniform_length(&self) -> bool {
        let mut lengths = self.histories.values().map(PerSlotHistory::len);
        match lengths.next() {
            None => true,
            Some(first) => lengths.all(|len| len == first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_history_evicts_oldest_past_capacity() {
        let mut hist = PerSlotHistory::new();
        for score in 0..20 {
            hist.push(score);
        }
        assert_eq!(hist.len(), ROLLING_WINDOW_SIZE);
        assert_eq!(hist.scores().next(), Some(&7));
    }

    #[test]
    fn selectable_times_excludes_configured_slots() {
        let cfg = StreamConfig {
            exclude_times: vec![SmolStr::new("11:00")],
            ..Default::default()
        };
        let selectable = cfg.selectable_times(Session::S2).unwrap();
        assert_eq!(
            selectable,
            vec![
                SmolStr::new("09:30"),
                SmolStr::new("10:00"),
                SmolStr::new("10:30")
            ]
        );
    }

    #[test]
    fn all_slots_excluded_fails_closed() {
        let cfg = StreamConfig {
            exclude_times: vec![
                SmolStr::new("07:30"),
                SmolStr::new("08:00"),
                SmolStr::new("09:00"),
            ],
            ..Default::default()
        };
        assert!(cfg.selectable_times(Session::S1).is_err());
    }
}
