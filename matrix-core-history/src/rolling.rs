use indexmap::IndexMap;
use matrix_core_domain::{DomainError, InvariantViolation, SequencerState};
use smol_str::SmolStr;

/// Update every canonical slot's rolling history for one trading day
/// (§4.7.2 step 1): `scores` must carry exactly one entry per canonical
/// slot of `state.current_session`, already computed via
/// `matrix_core_domain::score_of`.
///
/// Enforces I5 (uniform history length across slots) immediately after the
/// update and returns a [`DomainError`] naming the offending stream/date if
/// it doesn't hold — this should only ever trip on a logic defect, since
/// every canonical slot is scored unconditionally every day (§4.7.2: the
/// sequencer scores all canonical slots regardless of filtering).
pub fn update_day_scores(
    state: &mut SequencerState,
    scores: &IndexMap<SmolStr, i32>,
    stream: &str,
    trade_date: &str,
) -> Result<(), DomainError> {
    for (slot, score) in scores {
        state
            .histories
            .entry(slot.clone())
            .or_default()
            .push(*score);
    }

    if state.histories_uniform_length() {
        Ok(())
    } else {
        Err(DomainError::Invariant(InvariantViolation::UniformHistoryLength {
            stream: stream.to_string(),
            trade_date: trade_date.to_string(),
            lengths: state.history_lengths(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_core_domain::Session;

    #[test]
    fn updates_all_slots_and_stays_uniform() {
        let mut state = SequencerState::initial(
            Session::S1,
            &[SmolStr::new("07:30"), SmolStr::new("08:00"), SmolStr::new("09:00")],
        );
        let mut scores = IndexMap::new();
        scores.insert(SmolStr::new("07:30"), -2);
        scores.insert(SmolStr::new("08:00"), 1);
        scores.insert(SmolStr::new("09:00"), 0);

        update_day_scores(&mut state, &scores, "ES1", "2026-01-05").unwrap();

        assert_eq!(state.histories[&SmolStr::new("07:30")].sum(), -2);
        assert!(state.histories_uniform_length());
    }
}
