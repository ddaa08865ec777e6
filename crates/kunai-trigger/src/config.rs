//! Trigger construction settings.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kunai_core::config::{Settings, TriggerSettings};
use kunai_core::constants::DEFAULT_PRIORITY;
use kunai_rfc::rfc::ical::expand::{ExpansionOptions, TimeZoneResolver};
use serde::Serialize;

use crate::constants::REPEAT_INDEFINITELY;
use crate::error::{TriggerError, TriggerResult};
use crate::key::{JobKey, TriggerKey};
use crate::misfire::MisfireInstruction;

/// Limit on the total number of occurrences a trigger consumes, fired or
/// skipped by misfire recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    #[default]
    Indefinitely,
    Times(u32),
}

impl RepeatCount {
    /// ## Summary
    /// Converts the integer form, where [`REPEAT_INDEFINITELY`] means no limit.
    ///
    /// ## Errors
    ///
    /// Returns `TriggerError::InvalidConfiguration` for zero and for negative
    /// values other than the sentinel.
    pub fn from_raw(raw: i32) -> TriggerResult<Self> {
        if raw == REPEAT_INDEFINITELY {
            return Ok(Self::Indefinitely);
        }
        match u32::try_from(raw) {
            Ok(n) if n > 0 => Ok(Self::Times(n)),
            _ => Err(TriggerError::InvalidConfiguration(format!(
                "repeat count must be positive or {REPEAT_INDEFINITELY}, got {raw}"
            ))),
        }
    }

    /// Integer form, saturating at `i32::MAX`.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Indefinitely => REPEAT_INDEFINITELY,
            Self::Times(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    /// True when `consumed` occurrences use up the limit.
    #[must_use]
    pub const fn is_reached(self, consumed: u32) -> bool {
        match self {
            Self::Indefinitely => false,
            Self::Times(n) => consumed >= n,
        }
    }

    /// Occurrences left after `consumed`, or `None` without a limit.
    #[must_use]
    pub const fn remaining(self, consumed: u32) -> Option<u32> {
        match self {
            Self::Indefinitely => None,
            Self::Times(n) => Some(n.saturating_sub(consumed)),
        }
    }
}

/// Everything needed to build a [`crate::RecurrenceRuleTrigger`].
///
/// Validation happens in [`crate::RecurrenceRuleTrigger::new`].
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub key: TriggerKey,
    pub job_key: JobKey,
    /// RRULE text, kept verbatim by the trigger.
    pub recurrence_rule: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub time_zone: Tz,
    pub repeat_count: RepeatCount,
    pub misfire_instruction: MisfireInstruction,
    /// Higher fires first when fire times tie.
    pub priority: i32,
    pub expansion: ExpansionOptions,
}

impl TriggerConfig {
    /// Creates a config with UTC, no end, no repeat limit, the smart misfire
    /// policy and default priority.
    #[must_use]
    pub fn new(
        key: TriggerKey,
        job_key: JobKey,
        recurrence_rule: impl Into<String>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            job_key,
            recurrence_rule: recurrence_rule.into(),
            start,
            end: None,
            time_zone: Tz::UTC,
            repeat_count: RepeatCount::Indefinitely,
            misfire_instruction: MisfireInstruction::default(),
            priority: DEFAULT_PRIORITY,
            expansion: ExpansionOptions::default(),
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.end = end;
        self
    }

    #[must_use]
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }

    #[must_use]
    pub fn with_repeat_count(mut self, repeat_count: RepeatCount) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    #[must_use]
    pub fn with_misfire_instruction(mut self, instruction: MisfireInstruction) -> Self {
        self.misfire_instruction = instruction;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_expansion(mut self, options: ExpansionOptions) -> Self {
        self.expansion = options;
        self
    }

    /// ## Summary
    /// Builds a config from a `[[triggers]]` settings entry.
    ///
    /// The entry's zone falls back to `scheduler.time_zone`; the empty-period
    /// bound comes from `expansion.max_empty_periods`.
    ///
    /// ## Errors
    ///
    /// Returns `TriggerError::InvalidConfiguration` if a zone cannot be
    /// resolved or the repeat count is out of range.
    pub fn from_settings(
        entry: &TriggerSettings,
        settings: &Settings,
        resolver: &mut TimeZoneResolver,
    ) -> TriggerResult<Self> {
        let zone = entry
            .time_zone
            .as_deref()
            .unwrap_or(&settings.scheduler.time_zone);
        let time_zone = resolver
            .resolve(zone)
            .map_err(|e| TriggerError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            key: TriggerKey::with_group(&entry.name, &entry.group),
            job_key: JobKey::with_group(&entry.job, &entry.job_group),
            recurrence_rule: entry.rule.clone(),
            start: entry.start,
            end: entry.end,
            time_zone,
            repeat_count: RepeatCount::from_raw(entry.repeat_count)?,
            misfire_instruction: MisfireInstruction::from_code(entry.misfire_instruction),
            priority: entry.priority,
            expansion: ExpansionOptions::default()
                .with_max_empty_periods(settings.expansion.max_empty_periods),
        })
    }
}
