use crate::error::DomainError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;

/// Trading session a canonical time slot belongs to.
///
/// `S1` is the morning session, `S2` the mid-morning session (§3.2). A
/// stream's trailing digit (`1` or `2`) determines which session it trades.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Display)]
pub enum Session {
    #[display("S1")]
    #[serde(rename = "S1")]
    S1,
    #[display("S2")]
    #[serde(rename = "S2")]
    S2,
}

impl Session {
    /// Session implied by a stream's trailing digit, per the `{instrument}{1|2}` grammar.
    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Session::S1),
            '2' => Some(Session::S2),
            _ => None,
        }
    }
}

/// A stream identifier, eg/ `ES1`, `NQ2`, `RTY1`.
///
/// Grammar (§6.1): two or three uppercase letters (the instrument root)
/// followed by a single `1` or `2` (the session digit). This is the single
/// source of truth for stream-id parsing; `matrix-core-io`'s stream
/// discovery (C2) and filename-based repair (C3) both call [`Stream::parse`]
/// rather than maintaining their own pattern.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Display)]
pub struct Stream(SmolStr);

impl Stream {
    /// Parse a stream id, enforcing `^[A-Z]{2,3}[12]$`.
    ///
    /// Hand-written rather than regex-backed: no dependency in this
    /// workspace's stack is grounded for `regex`, and the grammar is small
    /// enough that a manual scan is clearer than a compiled pattern.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let bytes = raw.as_bytes();
        let len = bytes.len();
        if !(3..=4).contains(&len) {
            return Err(DomainError::InvalidStreamId(raw.to_string()));
        }

        let (root, digit) = raw.split_at(len - 1);
        let root_len_ok = matches!(root.len(), 2 | 3);
        let root_is_upper_alpha = root.chars().all(|c| c.is_ascii_uppercase());
        let digit_char = digit.chars().next();
        let digit_ok = matches!(digit_char, Some('1') | Some('2'));

        if root_len_ok && root_is_upper_alpha && digit_ok {
            Ok(Self(SmolStr::new(raw)))
        } else {
            Err(DomainError::InvalidStreamId(raw.to_string()))
        }
    }

    /// The instrument root, eg/ `Stream::parse("ES1")?.instrument_root() == "ES"`.
    pub fn instrument_root(&self) -> &str {
        &self.0.as_str()[..self.0.len() - 1]
    }

    /// The session implied by the trailing digit.
    pub fn session(&self) -> Session {
        let digit = self.0.chars().next_back().expect("non-empty stream id");
        Session::from_digit(digit).expect("Stream is only constructed via Stream::parse")
    }

    /// `true` for streams ending in `2` (subject to `DOM_BLOCKED_DAYS`, §4.4).
    pub fn is_two_stream(&self) -> bool {
        matches!(self.session(), Session::S2) && self.0.ends_with('2')
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for Stream {
    fn borrow(&self) -> &str {
        self.0.as_ref()
    }
}

impl AsRef<str> for Stream {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl<'de> Deserialize<'de> for Stream {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Stream::parse(&raw).map_err(serde::de::Error::custom)
    }
}
