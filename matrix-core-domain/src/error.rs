use thiserror::Error;

/// Errors that can arise while constructing or validating domain types.
///
/// This is the base of the error taxonomy described in §7. Every other
/// crate defines its own `thiserror` enum for its own concerns and wraps
/// `DomainError` with `#[from]` rather than duplicating these variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid stream id '{0}', expected ^[A-Z]{{2,3}}[12]$")]
    InvalidStreamId(String),

    #[error("stream '{stream}' has no selectable time slots after applying exclude_times")]
    EmptySelectableSlots { stream: String },

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// A Tier-0 contract violation (§7): fatal, never retried, always carries
/// enough context (stream, date, up to five sample values) to diagnose
/// without re-running the build.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error(
        "I1 violated: stream '{stream}' has {invalid_count} row(s) with missing/invalid trade_date, \
         first samples: {samples:?}"
    )]
    TradeDateContract {
        stream: String,
        invalid_count: usize,
        samples: Vec<String>,
    },

    #[error("I2 violated: Master Matrix is not sorted by (Stream, trade_date, entry_time)")]
    CanonicalSortOrder,

    #[error(
        "I3 violated: Time column mutated downstream of the sequencer for stream '{stream}' \
         on {trade_date} (expected '{expected}', found '{found}')"
    )]
    TimeOwnership {
        stream: String,
        trade_date: String,
        expected: String,
        found: String,
    },

    #[error(
        "I3 violated: zero rows matched on (Stream, trade_date, entry_time) while verifying Time \
         ownership for stream '{stream}' — the key-matching machinery itself is broken"
    )]
    TimeOwnershipNoMatches { stream: String },

    #[error(
        "I4 violated: stream '{stream}' selected non-selectable slot '{slot}' on {trade_date}"
    )]
    SelectableSlot {
        stream: String,
        trade_date: String,
        slot: String,
    },

    #[error(
        "I5 violated: stream '{stream}' has unequal rolling-history lengths across canonical slots \
         after processing {trade_date}: {lengths:?}"
    )]
    UniformHistoryLength {
        stream: String,
        trade_date: String,
        lengths: Vec<(String, usize)>,
    },

    #[error("I7 violated: parallel and sequential sequencer passes diverged for stream '{stream}'")]
    ParallelSequentialParity { stream: String },
}
