//! Upcoming fire times for configured triggers.

use chrono::{DateTime, SecondsFormat, Utc};
use kunai_core::config::{PreviewFormat, Settings};
use kunai_rfc::rfc::ical::expand::TimeZoneResolver;
use kunai_trigger::{RecurrenceRuleTrigger, TriggerConfig, TriggerState, compare_fire_order};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// A fire time in UTC and in the trigger's zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FireTime {
    pub utc: DateTime<Utc>,
    pub local: String,
}

/// Preview of one trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub trigger: String,
    pub job: String,
    pub rule: String,
    pub time_zone: String,
    pub priority: i32,
    pub state: TriggerState,
    pub final_fire_time: Option<DateTime<Utc>>,
    pub fire_times: Vec<FireTime>,
}

/// ## Summary
/// Builds a trigger for every `[[triggers]]` entry, in fire order.
///
/// ## Errors
/// Returns an error if the settings fail validation or an entry cannot be
/// turned into a trigger.
pub fn build_triggers(settings: &Settings) -> AppResult<Vec<RecurrenceRuleTrigger>> {
    settings.validate()?;

    let mut resolver = TimeZoneResolver::new();
    let mut triggers = settings
        .triggers
        .iter()
        .map(|entry| {
            TriggerConfig::from_settings(entry, settings, &mut resolver)
                .and_then(|config| RecurrenceRuleTrigger::new(config, None))
                .map_err(|source| AppError::TriggerSetup {
                    trigger: format!("{}.{}", entry.group, entry.name),
                    source,
                })
        })
        .collect::<AppResult<Vec<_>>>()?;

    triggers.sort_by(compare_fire_order);
    tracing::info!(count = triggers.len(), "Triggers loaded");
    Ok(triggers)
}

/// ## Summary
/// Collects up to `count` upcoming fire times per trigger.
///
/// ## Errors
/// Returns an error if expansion fails for a trigger.
pub fn collect(triggers: &[RecurrenceRuleTrigger], count: usize) -> AppResult<Vec<PreviewEntry>> {
    triggers
        .iter()
        .map(|trigger| -> AppResult<PreviewEntry> {
            let tz = trigger.time_zone();
            let fire_times = trigger
                .preview(count)?
                .into_iter()
                .map(|utc| FireTime {
                    utc,
                    local: utc
                        .with_timezone(&tz)
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                })
                .collect();

            Ok(PreviewEntry {
                trigger: trigger.key().to_string(),
                job: trigger.job_key().to_string(),
                rule: trigger.recurrence_rule_expression().to_string(),
                time_zone: tz.name().to_string(),
                priority: trigger.priority(),
                state: trigger.state(),
                final_fire_time: trigger.final_fire_time()?,
                fire_times,
            })
        })
        .collect()
}

/// ## Summary
/// Renders entries in the configured format.
///
/// ## Errors
/// Returns an error if JSON serialization fails.
pub fn render(format: PreviewFormat, entries: &[PreviewEntry]) -> AppResult<String> {
    match format {
        PreviewFormat::Text => Ok(render_text(entries)),
        PreviewFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
    }
}

/// Renders one block per trigger: a header line, then one fire time per line.
#[must_use]
pub fn render_text(entries: &[PreviewEntry]) -> String {
    let blocks: Vec<String> = entries
        .iter()
        .map(|entry| {
            let mut lines = vec![format!(
                "{} -> {} [{}] {} ({})",
                entry.trigger, entry.job, entry.state, entry.rule, entry.time_zone
            )];
            if entry.fire_times.is_empty() {
                lines.push("  (no upcoming fire times)".to_string());
            }
            lines.extend(entry.fire_times.iter().map(|time| {
                format!(
                    "  {}  {}",
                    time.utc.to_rfc3339_opts(SecondsFormat::Secs, true),
                    time.local
                )
            }));
            lines.join("\n")
        })
        .collect();
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests;
