//! RECUR value parsing.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};

/// Parses a RECUR (RRULE) value (RFC 5545 §3.3.10).
///
/// Accepts an optional `RRULE:` prefix, case-insensitive part names and a
/// trailing `;`. `X-` extension parts are ignored.
///
/// ## Errors
/// Returns an error if the string is not a valid recurrence rule, a value is
/// outside its domain, or the parts contradict each other.
pub fn parse_rrule(s: &str) -> ParseResult<RRule> {
    let trimmed = s.trim();
    let (body, mut offset) = match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => (&trimmed[6..], 6),
        _ => (trimmed, 0),
    };

    if body.is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, 0));
    }

    let mut freq = None;
    let mut rrule = RRule::new(Frequency::Yearly);
    let mut seen = HashSet::new();

    for part in body.split(';') {
        let part_offset = offset;
        offset += part.len() + 1;

        if part.is_empty() {
            continue;
        }

        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| ParseError::new(ParseErrorKind::MalformedPart, part_offset))?;
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim();

        if key.starts_with("X-") {
            tracing::trace!(part = %key, "Ignoring extension rule part");
            continue;
        }

        if !seen.insert(key.clone()) {
            return Err(
                ParseError::new(ParseErrorKind::DuplicatePart, part_offset).with_context(key)
            );
        }

        if key == "FREQ" {
            freq = Some(Frequency::parse(value).ok_or_else(|| {
                ParseError::new(ParseErrorKind::InvalidFrequency, part_offset)
                    .with_context(value.to_string())
            })?);
        } else {
            parse_rrule_part(&mut rrule, &key, value, part_offset)?;
        }
    }

    rrule.freq = freq.ok_or_else(|| ParseError::new(ParseErrorKind::MissingFrequency, 0))?;
    validate_rrule(&rrule)?;

    Ok(rrule)
}

/// Parses a single RRULE key-value pair.
fn parse_rrule_part(rrule: &mut RRule, key: &str, value: &str, offset: usize) -> ParseResult<()> {
    match key {
        "INTERVAL" => {
            rrule.interval = parse_positive(value, ParseErrorKind::InvalidInterval, offset)?;
        }
        "COUNT" => parse_rrule_count(rrule, value, offset)?,
        "UNTIL" => parse_rrule_until(rrule, value, offset)?,
        "WKST" => {
            rrule.wkst = Some(
                Weekday::parse(value)
                    .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidWeekday, offset))?,
            );
        }
        "BYSECOND" => rrule.by_second = parse_list(value, |v: u8| v <= 60, offset)?,
        "BYMINUTE" => rrule.by_minute = parse_list(value, |v: u8| v <= 59, offset)?,
        "BYHOUR" => rrule.by_hour = parse_list(value, |v: u8| v <= 23, offset)?,
        "BYDAY" => rrule.by_day = parse_byday(value, offset)?,
        "BYMONTHDAY" => {
            rrule.by_monthday = parse_list(value, |v: i8| v != 0 && v.unsigned_abs() <= 31, offset)?;
        }
        "BYYEARDAY" => {
            rrule.by_yearday = parse_list(value, |v: i16| v != 0 && v.unsigned_abs() <= 366, offset)?;
        }
        "BYWEEKNO" => {
            rrule.by_weekno = parse_list(value, |v: i8| v != 0 && v.unsigned_abs() <= 53, offset)?;
        }
        "BYMONTH" => rrule.by_month = parse_list(value, |v: u8| (1..=12).contains(&v), offset)?,
        "BYSETPOS" => {
            rrule.by_setpos = parse_list(value, |v: i16| v != 0 && v.unsigned_abs() <= 366, offset)?;
        }
        _ => {
            return Err(
                ParseError::new(ParseErrorKind::UnknownPart, offset).with_context(key.to_string())
            );
        }
    }
    Ok(())
}

/// Parses a strictly positive integer.
fn parse_positive(value: &str, kind: ParseErrorKind, offset: usize) -> ParseResult<u32> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseError::new(kind, offset).with_context(value.to_string())),
    }
}

/// Parses the COUNT component of an RRULE.
fn parse_rrule_count(rrule: &mut RRule, value: &str, offset: usize) -> ParseResult<()> {
    if rrule.until.is_some() {
        return Err(ParseError::new(ParseErrorKind::UntilCountConflict, offset));
    }
    rrule.count = Some(parse_positive(value, ParseErrorKind::InvalidCount, offset)?);
    Ok(())
}

/// Parses the UNTIL component of an RRULE.
fn parse_rrule_until(rrule: &mut RRule, value: &str, offset: usize) -> ParseResult<()> {
    if rrule.count.is_some() {
        return Err(ParseError::new(ParseErrorKind::UntilCountConflict, offset));
    }

    let invalid = || ParseError::new(ParseErrorKind::InvalidUntil, offset).with_context(value);

    let until = match value.len() {
        8 => RRuleUntil::Date(NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_err| invalid())?),
        15 => RRuleUntil::Floating(
            NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_err| invalid())?,
        ),
        16 if value.ends_with(['Z', 'z']) => RRuleUntil::Utc(
            NaiveDateTime::parse_from_str(&value[..15], "%Y%m%dT%H%M%S")
                .map_err(|_err| invalid())?
                .and_utc(),
        ),
        _ => return Err(invalid()),
    };

    rrule.until = Some(until);
    Ok(())
}

/// Parses a comma-separated list of numbers, each checked against `valid`.
fn parse_list<T>(s: &str, valid: impl Fn(T) -> bool, offset: usize) -> ParseResult<Vec<T>>
where
    T: FromStr + Copy,
{
    s.split(',')
        .map(|v| {
            let v = v.trim();
            let n = v.parse::<T>().map_err(|_err| {
                ParseError::new(ParseErrorKind::InvalidList, offset).with_context(v.to_string())
            })?;
            if valid(n) {
                Ok(n)
            } else {
                Err(ParseError::new(ParseErrorKind::ValueOutOfRange, offset)
                    .with_context(v.to_string()))
            }
        })
        .collect()
}

/// Parses a BYDAY value (weekdays with optional ordinals).
fn parse_byday(s: &str, offset: usize) -> ParseResult<Vec<WeekdayNum>> {
    s.split(',')
        .map(|v| parse_weekday_num(v.trim(), offset))
        .collect()
}

/// Parses a single weekday with optional ordinal (e.g., "MO", "1MO", "-1FR").
fn parse_weekday_num(s: &str, offset: usize) -> ParseResult<WeekdayNum> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidWeekday, offset).with_context(s);

    // The last two characters name the weekday
    if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
        return Err(invalid());
    }

    let (ordinal_str, weekday_str) = s.split_at(s.len() - 2);
    let weekday = Weekday::parse(weekday_str).ok_or_else(invalid)?;

    let ordinal = if ordinal_str.is_empty() {
        None
    } else {
        let n: i8 = ordinal_str.parse().map_err(|_err| invalid())?;
        if n == 0 || n.unsigned_abs() > 53 {
            return Err(ParseError::new(ParseErrorKind::ValueOutOfRange, offset).with_context(s));
        }
        Some(n)
    };

    Ok(WeekdayNum { ordinal, weekday })
}

/// ## Summary
/// Checks the cross-part restrictions of RFC 5545 §3.3.10 on a rule.
///
/// ## Errors
/// Returns an error when COUNT and UNTIL are both set, INTERVAL or COUNT is
/// zero, a BYxxx part is not permitted with the rule's frequency, BYDAY
/// carries ordinals where they have no meaning, or BYSETPOS is used alone.
pub fn validate_rrule(rrule: &RRule) -> ParseResult<()> {
    if rrule.count.is_some() && rrule.until.is_some() {
        return Err(ParseError::new(ParseErrorKind::UntilCountConflict, 0));
    }
    if rrule.interval == 0 {
        return Err(ParseError::new(ParseErrorKind::InvalidInterval, 0));
    }
    if rrule.count == Some(0) {
        return Err(ParseError::new(ParseErrorKind::InvalidCount, 0));
    }

    let not_allowed =
        |part: &str| ParseError::new(ParseErrorKind::PartNotAllowed, 0).with_context(part);

    if !rrule.by_weekno.is_empty() && rrule.freq != Frequency::Yearly {
        return Err(not_allowed("BYWEEKNO"));
    }
    if !rrule.by_yearday.is_empty()
        && matches!(
            rrule.freq,
            Frequency::Daily | Frequency::Weekly | Frequency::Monthly
        )
    {
        return Err(not_allowed("BYYEARDAY"));
    }
    if !rrule.by_monthday.is_empty() && rrule.freq == Frequency::Weekly {
        return Err(not_allowed("BYMONTHDAY"));
    }

    let has_ordinals = rrule.by_day.iter().any(|d| d.ordinal.is_some());
    let ordinals_allowed = match rrule.freq {
        Frequency::Monthly => true,
        Frequency::Yearly => rrule.by_weekno.is_empty(),
        _ => false,
    };
    if has_ordinals && !ordinals_allowed {
        return Err(ParseError::new(ParseErrorKind::OrdinalNotAllowed, 0));
    }

    let has_other_by = !rrule.by_second.is_empty()
        || !rrule.by_minute.is_empty()
        || !rrule.by_hour.is_empty()
        || !rrule.by_month.is_empty()
        || rrule.has_day_parts();
    if !rrule.by_setpos.is_empty() && !has_other_by {
        return Err(ParseError::new(ParseErrorKind::SetPosWithoutFilter, 0));
    }

    Ok(())
}

impl FromStr for RRule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rrule(s)
    }
}
