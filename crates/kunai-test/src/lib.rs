//! Shared helpers for kunai integration tests.
//!
//! Expansion results are compared against the `rrule` crate, which serves
//! as an independent implementation of RFC 5545 recurrence.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;
use kunai_rfc::rfc::ical::core::RRule;
use kunai_rfc::rfc::ical::expand::{ExpansionOptions, TimeZoneResolver, expand, localize};

/// ## Summary
/// Resolves `time_zone` and converts a `YYYYMMDDTHHMMSS` wall-clock time in
/// it to UTC.
///
/// ## Errors
/// Returns an error for unknown zones, malformed times and DST-gap times.
pub fn anchor(time_zone: &str, local: &str) -> anyhow::Result<(Tz, DateTime<Utc>)> {
    let tz = TimeZoneResolver::new().resolve(time_zone)?;
    let naive = NaiveDateTime::parse_from_str(local, "%Y%m%dT%H%M%S")?;
    Ok((tz, localize(tz, naive)?))
}

/// ## Summary
/// Expands `rule` and returns at most `limit` occurrences.
///
/// ## Errors
/// Returns an error if the rule text is invalid or expansion is exhausted.
pub fn occurrences(
    rule: &str,
    tz: Tz,
    anchor: DateTime<Utc>,
    after: Option<DateTime<Utc>>,
    limit: usize,
) -> anyhow::Result<Vec<DateTime<Utc>>> {
    let rule: RRule = rule.parse()?;
    let dates = expand(&rule, anchor, tz, after, ExpansionOptions::default())
        .take(limit)
        .collect::<Result<_, _>>()?;
    Ok(dates)
}

/// ## Summary
/// Expands the same rule with the `rrule` crate.
///
/// ## Errors
/// Returns an error if the `rrule` crate rejects the rule set.
pub fn rrule_crate_occurrences(
    time_zone: &str,
    dtstart: &str,
    rule: &str,
    limit: u16,
) -> anyhow::Result<Vec<DateTime<Utc>>> {
    let text = if time_zone == "UTC" {
        format!("DTSTART:{dtstart}Z\nRRULE:{rule}")
    } else {
        format!("DTSTART;TZID={time_zone}:{dtstart}\nRRULE:{rule}")
    };
    tracing::debug!(%text, "Expanding with the rrule crate");
    let set: rrule::RRuleSet = text.parse()?;
    Ok(set
        .all(limit)
        .dates
        .iter()
        .map(|d| d.with_timezone(&Utc))
        .collect())
}

/// Parses an RFC 3339 timestamp, panicking with the offending value.
#[must_use]
pub fn parse_rfc3339(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value)
        .unwrap_or_else(|err| panic!("Failed to parse rfc3339 value {value}: {err}"))
}

/// Parses an RFC 3339 timestamp into UTC.
#[must_use]
pub fn utc(value: &str) -> DateTime<Utc> {
    parse_rfc3339(value).with_timezone(&Utc)
}
