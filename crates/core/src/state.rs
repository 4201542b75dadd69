//! Invocation state vocabulary.
//!
//! The external workflow service owns the state machine. This module only
//! knows the four recognized values and which of them are terminal; any
//! other value is kept verbatim so newer upstream states survive a round
//! trip through the store.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATE_QUEUED: &str = "queued";
pub const STATE_IN_PROGRESS: &str = "in_progress";
pub const STATE_COMPLETED: &str = "completed";
pub const STATE_FAILED: &str = "failed";

/// Stored values that end reconciliation for a record.
pub const TERMINAL_STATES: [&str; 2] = [STATE_COMPLETED, STATE_FAILED];

/// Externally reported state of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvocationState {
    Queued,
    InProgress,
    Completed,
    Failed,
    /// A value outside the recognized set, stored as reported.
    Other(String),
}

impl InvocationState {
    /// The string persisted in the `state` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => STATE_QUEUED,
            Self::InProgress => STATE_IN_PROGRESS,
            Self::Completed => STATE_COMPLETED,
            Self::Failed => STATE_FAILED,
            Self::Other(raw) => raw,
        }
    }

    /// `completed` and `failed` are terminal. Unrecognized values never are.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for InvocationState {
    fn from(raw: &str) -> Self {
        match raw {
            STATE_QUEUED => Self::Queued,
            STATE_IN_PROGRESS => Self::InProgress,
            STATE_COMPLETED => Self::Completed,
            STATE_FAILED => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for InvocationState {
    fn from(raw: String) -> Self {
        match Self::from(raw.as_str()) {
            Self::Other(_) => Self::Other(raw),
            known => known,
        }
    }
}

impl From<InvocationState> for String {
    fn from(state: InvocationState) -> Self {
        match state {
            InvocationState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
