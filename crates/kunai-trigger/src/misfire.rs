//! Misfire recovery for triggers the host failed to fire on time.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::constants::{
    MISFIRE_INSTRUCTION_DO_NOTHING, MISFIRE_INSTRUCTION_FIRE_ONCE_NOW,
    MISFIRE_INSTRUCTION_SMART_POLICY,
};
use crate::trigger::RecurrenceRuleTrigger;

/// Policy applied when a fire time was missed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MisfireInstruction {
    /// Recurrence-rule triggers treat this as [`Self::FireOnceNow`].
    #[default]
    Smart,
    FireOnceNow,
    DoNothing,
}

/// What the host should do about a misfired trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MisfireAction {
    /// Fire once immediately with the missed fire time.
    FireNow,
    /// The missed occurrences were skipped; wait for the next fire time.
    SkipToNext,
}

impl MisfireInstruction {
    /// Maps an integer code; unknown codes fall back to [`Self::Smart`].
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            MISFIRE_INSTRUCTION_SMART_POLICY => Self::Smart,
            MISFIRE_INSTRUCTION_FIRE_ONCE_NOW => Self::FireOnceNow,
            MISFIRE_INSTRUCTION_DO_NOTHING => Self::DoNothing,
            other => {
                tracing::debug!(code = other, "Unknown misfire instruction, using smart policy");
                Self::Smart
            }
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Smart => MISFIRE_INSTRUCTION_SMART_POLICY,
            Self::FireOnceNow => MISFIRE_INSTRUCTION_FIRE_ONCE_NOW,
            Self::DoNothing => MISFIRE_INSTRUCTION_DO_NOTHING,
        }
    }
}

/// ## Summary
/// Decides how to recover `trigger` from a misfire observed at `now`.
///
/// `DoNothing` skips to the next occurrence; every other instruction fires
/// once now.
#[must_use]
pub fn resolve_misfire(trigger: &RecurrenceRuleTrigger, now: DateTime<Utc>) -> MisfireAction {
    let action = match trigger.misfire_instruction() {
        MisfireInstruction::DoNothing => MisfireAction::SkipToNext,
        MisfireInstruction::Smart | MisfireInstruction::FireOnceNow => MisfireAction::FireNow,
    };
    tracing::debug!(
        trigger = %trigger.key(),
        %now,
        ?action,
        "Resolved misfire"
    );
    action
}

impl RecurrenceRuleTrigger {
    /// ## Summary
    /// True when the next fire time is older than `now` by more than
    /// `threshold`.
    #[must_use]
    pub fn is_misfired(&self, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        self.next_fire_time()
            .is_some_and(|next| now.signed_duration_since(next) > threshold)
    }

    /// ## Summary
    /// Resolves the misfire policy and applies it.
    ///
    /// For [`MisfireAction::FireNow`] the cursor keeps the missed fire time;
    /// the host fires once, and the next fire time computed afterwards lies
    /// after `now`. For [`MisfireAction::SkipToNext`] the next fire time
    /// moves to the first accepted occurrence after `now`.
    ///
    /// ## Side Effects
    ///
    /// Occurrences passed over count as skipped against the repeat limit.
    /// A trigger whose limit or rule runs out completes; a terminal trigger
    /// is left unchanged. While a firing is in flight or the trigger is
    /// paused the skip is deferred: it is applied by
    /// [`Self::trigger_fired`], or on resumption, after the in-flight
    /// occurrence has been recorded.
    pub fn update_after_misfire(&self, now: DateTime<Utc>) -> MisfireAction {
        let action = resolve_misfire(self, now);
        let mut inner = self.lock();

        if inner.state.is_terminal() {
            tracing::warn!(
                trigger = %self.key(),
                state = %inner.state,
                "Misfire update on a terminal trigger ignored"
            );
            return action;
        }

        match action {
            MisfireAction::FireNow => inner.catch_up = Some(now),
            MisfireAction::SkipToNext if inner.cursor_frozen() => inner.defer(Some(now)),
            MisfireAction::SkipToNext => {
                if inner.cursor.next_fire.is_some_and(|next| next <= now) {
                    let after = inner.consumed_through;
                    self.advance_cursor(&mut inner, after, Some(now));
                }
            }
        }

        tracing::debug!(
            trigger = %self.key(),
            next_fire = ?inner.cursor.next_fire,
            skipped = inner.cursor.skipped_count,
            state = %inner.state,
            "Applied misfire policy"
        );
        action
    }
}
