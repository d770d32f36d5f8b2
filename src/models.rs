use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every poll and quality control question carries exactly four choices.
pub const CHOICE_COUNT: usize = 4;

/// The authenticated user. This is the opaque blob SessionStore persists;
/// the `userid` field name matches the backend's login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userid")]
    pub user_id: i64,
    pub username: String,
}

/// A poll as consumed by the client. Immutable after creation; choices are
/// 1-indexed whenever they appear in a backend payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    pub author_id: i64,
    pub question: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub choices: [String; CHOICE_COUNT],
}

/// A quality control question. Ephemeral: re-fetched on every gate attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub question_id: i64,
    pub question: String,
    pub description: Option<String>,
    pub choices: [String; CHOICE_COUNT],
}

/// Whether a user has already responded to a poll, and with which choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub responded: bool,
    /// 1-based wire index of the stored response, when `responded`.
    pub choice_index: Option<u8>,
}

impl ResponseStatus {
    pub fn none() -> Self {
        ResponseStatus {
            responded: false,
            choice_index: None,
        }
    }
}

/// Raw per-choice vote counts, keyed by choice label.
pub type Tally = HashMap<String, u64>;

/// 0-based display index -> 1-based wire index.
pub fn to_wire_index(display: usize) -> u8 {
    debug_assert!(display < CHOICE_COUNT);
    display as u8 + 1
}

/// 1-based wire index -> 0-based display index. `None` when out of range.
pub fn to_display_index(wire: u8) -> Option<usize> {
    if (1..=CHOICE_COUNT as u8).contains(&wire) {
        Some(wire as usize - 1)
    } else {
        None
    }
}
