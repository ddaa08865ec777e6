//! Gregorian calendar helpers used by the expander.

use chrono::{Datelike, Days, NaiveDate, Weekday};

pub(super) const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub(super) const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

pub(super) const fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Days from `week_start` forward to `weekday` (0..7).
pub(super) const fn days_since(weekday: Weekday, week_start: Weekday) -> u32 {
    (weekday.num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7
}

/// First day of the week containing `date`.
pub(super) fn start_of_week(date: NaiveDate, week_start: Weekday) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days_since(
        date.weekday(),
        week_start,
    ))))
}

/// First day of week 1 of `year`: the first week with at least four days in
/// that year.
pub(super) fn first_week_start(year: i32, week_start: Weekday) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let offset = days_since(jan1.weekday(), week_start);
    if offset <= 3 {
        jan1.checked_sub_days(Days::new(u64::from(offset)))
    } else {
        jan1.checked_add_days(Days::new(u64::from(7 - offset)))
    }
}

/// Week number of `date` within its week-numbering year, and the number of
/// weeks in that year (52 or 53).
pub(super) fn week_number(date: NaiveDate, week_start: Weekday) -> Option<(i64, i64)> {
    let year = date.year();
    let mut start = first_week_start(year, week_start)?;
    let mut next = first_week_start(year.checked_add(1)?, week_start)?;

    if date < start {
        next = start;
        start = first_week_start(year.checked_sub(1)?, week_start)?;
    } else if date >= next {
        start = next;
        next = first_week_start(year.checked_add(2)?, week_start)?;
    }

    let week = date.signed_duration_since(start).num_days() / 7 + 1;
    let weeks = next.signed_duration_since(start).num_days() / 7;
    Some((week, weeks))
}

/// Position of `date` among the days sharing its weekday in `[first, last]`,
/// counted from the front (1, 2, ...) and from the back (-1, -2, ...).
pub(super) fn weekday_positions(date: NaiveDate, first: NaiveDate, last: NaiveDate) -> (i64, i64) {
    let front = date.signed_duration_since(first).num_days() / 7 + 1;
    let back = -(last.signed_duration_since(date).num_days() / 7 + 1);
    (front, back)
}
