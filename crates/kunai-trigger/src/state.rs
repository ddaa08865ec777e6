//! Trigger lifecycle states and the fire cursor.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TriggerError;

/// Lifecycle state of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TriggerState {
    /// Waiting for its next fire time.
    Waiting,
    /// Claimed by the host, which is executing the job.
    Acquired,
    /// Suspended by the host. `acquired` records whether the host was
    /// executing the job when the trigger was paused.
    Paused { acquired: bool },
    /// No further fire times.
    Complete { reason: CompletionReason },
    /// Expansion failed; the trigger never fires again.
    Error { fault: TriggerFault },
}

/// Why a trigger completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Fired and skipped occurrences reached the repeat limit.
    RepeatLimitReached,
    /// The next occurrence lies after the trigger's end instant.
    EndReached,
    /// The rule's COUNT or UNTIL was reached.
    RuleExhausted,
}

/// Unrecoverable expansion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerFault {
    ExpansionExhausted,
    ExclusionDeadlock,
}

impl TriggerState {
    /// True for `Complete` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    #[must_use]
    pub const fn is_paused(self) -> bool {
        matches!(self, Self::Paused { .. })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Acquired => "acquired",
            Self::Paused { .. } => "paused",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}

impl std::fmt::Display for TriggerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TriggerFault {
    /// Maps an expansion error to the fault it leaves the trigger in.
    ///
    /// Returns `None` for errors that only occur at construction.
    #[must_use]
    pub const fn from_error(err: &TriggerError) -> Option<Self> {
        match err {
            TriggerError::ExpansionExhausted { .. } => Some(Self::ExpansionExhausted),
            TriggerError::ExclusionDeadlock { .. } => Some(Self::ExclusionDeadlock),
            TriggerError::InvalidRecurrenceRule(_) | TriggerError::InvalidConfiguration(_) => {
                None
            }
        }
    }
}

/// Fire-time bookkeeping owned by one trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FireCursor {
    pub previous_fire: Option<DateTime<Utc>>,
    /// `None` once the trigger can no longer fire.
    pub next_fire: Option<DateTime<Utc>>,
    pub fire_count: u32,
    /// Occurrences passed over by misfire recovery.
    pub skipped_count: u32,
}

impl FireCursor {
    /// Occurrences consumed from the repeat limit: fired plus skipped.
    #[must_use]
    pub const fn consumed(&self) -> u32 {
        self.fire_count.saturating_add(self.skipped_count)
    }
}
