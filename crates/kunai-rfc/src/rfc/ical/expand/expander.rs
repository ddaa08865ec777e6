//! Period-by-period RRULE expansion.

use std::collections::VecDeque;

use chrono::{
    DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc,
};
use chrono_tz::Tz;
use kunai_core::constants::DEFAULT_MAX_EMPTY_PERIODS;

use super::calendar::{
    days_in_month, days_in_year, start_of_week, week_number, weekday_positions,
};
use super::timezone::localize;
use crate::rfc::ical::core::{Frequency, RRule, RRuleUntil};

/// Error during recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpansionError {
    /// No occurrence was found within the configured number of consecutive
    /// periods; the rule is treated as unsatisfiable.
    #[error("No occurrence found within {limit} consecutive periods")]
    Exhausted { limit: u32 },
}

/// Options for recurrence expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Consecutive periods without an occurrence tolerated before expansion
    /// fails with [`ExpansionError::Exhausted`].
    pub max_empty_periods: u32,

    /// Inclusive upper bound; the sequence ends after it, as with UNTIL.
    pub range_end: Option<DateTime<Utc>>,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_empty_periods: DEFAULT_MAX_EMPTY_PERIODS,
            range_end: None,
        }
    }
}

impl ExpansionOptions {
    /// Sets the empty-period bound.
    #[must_use]
    pub fn with_max_empty_periods(mut self, max: u32) -> Self {
        self.max_empty_periods = max;
        self
    }

    /// Sets the inclusive upper bound.
    #[must_use]
    pub fn with_range_end(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.range_end = end;
        self
    }
}

/// Outcome of a single day-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayCheck {
    Match,
    /// Month not in BYMONTH; the rest of the month can be skipped.
    MonthMiss,
    DayMiss,
}

/// What a period contributed.
enum PeriodFill {
    Candidates(Vec<NaiveDateTime>),
    /// Nothing before this wall-clock time can match.
    SkipTo(NaiveDateTime),
}

/// BYxxx parts with the anchor-derived defaults of RFC 5545 filled in.
#[derive(Debug, Clone)]
struct Plan {
    freq: Frequency,
    interval: i64,
    wkst: chrono::Weekday,
    by_month: Vec<u32>,
    by_weekno: Vec<i64>,
    by_yearday: Vec<i64>,
    by_monthday: Vec<i64>,
    by_weekday: Vec<chrono::Weekday>,
    by_nth_weekday: Vec<(i64, chrono::Weekday)>,
    nth_in_month: bool,
    by_hour: Vec<u32>,
    by_minute: Vec<u32>,
    by_second: Vec<u32>,
    by_setpos: Vec<i64>,
    /// BYHOUR x BYMINUTE x BYSECOND, for DAILY and coarser.
    times: Vec<NaiveTime>,
}

fn sorted<T: Ord + Copy, U>(values: &[U], map: impl Fn(&U) -> T) -> Vec<T> {
    let mut out: Vec<T> = values.iter().map(map).collect();
    out.sort_unstable();
    out.dedup();
    out
}

impl Plan {
    fn new(rule: &RRule, anchor: NaiveDateTime) -> Self {
        let day_parts = rule.has_day_parts();

        let mut by_month = sorted(&rule.by_month, |&m| u32::from(m));
        let mut by_monthday = sorted(&rule.by_monthday, |&d| i64::from(d));
        let mut by_weekday: Vec<chrono::Weekday> = rule
            .by_day
            .iter()
            .filter(|d| d.ordinal.is_none())
            .map(|d| d.weekday.to_chrono())
            .collect();
        let by_nth_weekday = rule
            .by_day
            .iter()
            .filter_map(|d| d.ordinal.map(|n| (i64::from(n), d.weekday.to_chrono())))
            .collect();

        if !day_parts {
            match rule.freq {
                Frequency::Yearly => {
                    if by_month.is_empty() {
                        by_month = vec![anchor.month()];
                    }
                    by_monthday = vec![i64::from(anchor.day())];
                }
                Frequency::Monthly => by_monthday = vec![i64::from(anchor.day())],
                Frequency::Weekly => by_weekday = vec![anchor.weekday()],
                _ => {}
            }
        }

        let time_part = |values: &[u8], coarser_than: Frequency, fallback: u32| {
            if values.is_empty() && rule.freq > coarser_than {
                vec![fallback]
            } else {
                sorted(values, |&v| u32::from(v))
            }
        };
        let by_hour = time_part(&rule.by_hour, Frequency::Hourly, anchor.hour());
        let by_minute = time_part(&rule.by_minute, Frequency::Minutely, anchor.minute());
        let by_second = time_part(&rule.by_second, Frequency::Secondly, anchor.second());

        let mut times = Vec::new();
        if rule.freq >= Frequency::Daily {
            for &h in &by_hour {
                for &m in &by_minute {
                    // Second 60 has no wall-clock representation
                    times.extend(
                        by_second
                            .iter()
                            .filter_map(|&s| NaiveTime::from_hms_opt(h, m, s)),
                    );
                }
            }
        }

        Self {
            freq: rule.freq,
            interval: i64::from(rule.interval),
            wkst: rule.week_start().to_chrono(),
            by_month,
            by_weekno: sorted(&rule.by_weekno, |&w| i64::from(w)),
            by_yearday: sorted(&rule.by_yearday, |&d| i64::from(d)),
            by_monthday,
            by_weekday,
            by_nth_weekday,
            nth_in_month: rule.freq == Frequency::Monthly || !rule.by_month.is_empty(),
            by_hour,
            by_minute,
            by_second,
            by_setpos: rule.by_setpos.iter().map(|&p| i64::from(p)).collect(),
            times,
        }
    }

    fn check_day(&self, date: NaiveDate) -> DayCheck {
        if !self.by_month.is_empty() && !self.by_month.contains(&date.month()) {
            return DayCheck::MonthMiss;
        }

        if !self.by_weekno.is_empty() {
            let Some((week, weeks)) = week_number(date, self.wkst) else {
                return DayCheck::DayMiss;
            };
            if !matches_signed(&self.by_weekno, week, weeks) {
                return DayCheck::DayMiss;
            }
        }

        if !self.by_yearday.is_empty() {
            let len = i64::from(days_in_year(date.year()));
            if !matches_signed(&self.by_yearday, i64::from(date.ordinal()), len) {
                return DayCheck::DayMiss;
            }
        }

        if !self.by_monthday.is_empty() {
            let len = i64::from(days_in_month(date.year(), date.month()));
            if !matches_signed(&self.by_monthday, i64::from(date.day()), len) {
                return DayCheck::DayMiss;
            }
        }

        if (!self.by_weekday.is_empty() || !self.by_nth_weekday.is_empty())
            && !self.matches_weekday(date)
        {
            return DayCheck::DayMiss;
        }

        DayCheck::Match
    }

    fn matches_weekday(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        if self.by_weekday.contains(&weekday) {
            return true;
        }

        self.by_nth_weekday
            .iter()
            .filter(|(_, w)| *w == weekday)
            .any(|&(n, _)| {
                let span = if self.nth_in_month {
                    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).zip(
                        NaiveDate::from_ymd_opt(
                            date.year(),
                            date.month(),
                            days_in_month(date.year(), date.month()),
                        ),
                    )
                } else {
                    NaiveDate::from_ymd_opt(date.year(), 1, 1)
                        .zip(NaiveDate::from_ymd_opt(date.year(), 12, 31))
                };
                span.is_some_and(|(first, last)| {
                    let (front, back) = weekday_positions(date, first, last);
                    n == front || n == back
                })
            })
    }
}

/// True when `value` (1-based) or its from-the-end form is listed.
fn matches_signed(list: &[i64], value: i64, len: i64) -> bool {
    list.iter().any(|&n| n == value || n == value - len - 1)
}

/// Picks BYSETPOS positions out of a sorted period set.
fn select_positions(set: &[DateTime<Utc>], positions: &[i64]) -> Vec<DateTime<Utc>> {
    let Ok(len) = i64::try_from(set.len()) else {
        return Vec::new();
    };
    let mut out: Vec<DateTime<Utc>> = positions
        .iter()
        .filter_map(|&p| {
            let index = if p > 0 { p - 1 } else { len + p };
            usize::try_from(index).ok().and_then(|i| set.get(i).copied())
        })
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year().checked_add(1)?, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

fn months_since_epoch(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Lazy, ascending expansion of a recurrence rule.
///
/// Yields `Ok(instant)` for every occurrence after the lower bound and a
/// single `Err` if the rule turns out to be unsatisfiable. A clone continues
/// independently from the same position; call [`expand`] again to start
/// over.
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    rule: &'a RRule,
    plan: Plan,
    tz: Tz,
    anchor: DateTime<Utc>,
    anchor_local: NaiveDateTime,
    after: Option<DateTime<Utc>>,
    options: ExpansionOptions,
    /// Start of period 0 for fixed-length frequencies (WEEKLY and finer).
    base: NaiveDateTime,
    /// Length of one interval step in seconds, for WEEKLY and finer.
    step_secs: i64,
    /// Periods starting after this wall-clock time cannot produce anything.
    stop_local: Option<NaiveDateTime>,
    period: i64,
    pending: VecDeque<DateTime<Utc>>,
    counted: u32,
    empty_periods: u32,
    finished: bool,
}

/// ## Summary
/// Expands `rule` anchored at `anchor` into an ascending sequence of instants.
///
/// The sequence starts at the period containing `anchor` and only yields
/// instants at or after `anchor` and strictly after `after`. COUNT is counted
/// from the anchor, so occurrences at or before `after` still consume it.
/// Calendar arithmetic happens on wall-clock time in `tz`.
///
/// ## Side Effects
///
/// None - expansion is pure and driven entirely by the returned iterator.
#[must_use]
pub fn expand(
    rule: &RRule,
    anchor: DateTime<Utc>,
    tz: Tz,
    after: Option<DateTime<Utc>>,
    options: ExpansionOptions,
) -> Expansion<'_> {
    Expansion::new(rule, anchor, tz, after, options)
}

/// ## Summary
/// Returns the first occurrence of `rule` strictly after `after`, or at or
/// after `anchor` when `after` is `None`.
///
/// ## Errors
///
/// Returns `ExpansionError::Exhausted` if the rule is unsatisfiable within the
/// configured bound.
pub fn next_after(
    rule: &RRule,
    anchor: DateTime<Utc>,
    tz: Tz,
    after: Option<DateTime<Utc>>,
    options: ExpansionOptions,
) -> Result<Option<DateTime<Utc>>, ExpansionError> {
    expand(rule, anchor, tz, after, options).next().transpose()
}

impl<'a> Expansion<'a> {
    fn new(
        rule: &'a RRule,
        anchor: DateTime<Utc>,
        tz: Tz,
        after: Option<DateTime<Utc>>,
        options: ExpansionOptions,
    ) -> Self {
        let anchor_local = anchor.with_timezone(&tz).naive_local();
        let plan = Plan::new(rule, anchor_local);

        let date = anchor_local.date();
        let (base, unit_secs) = match rule.freq {
            Frequency::Weekly => (
                start_of_week(date, plan.wkst).unwrap_or(date).and_time(NaiveTime::MIN),
                7 * 86_400,
            ),
            Frequency::Daily => (date.and_time(NaiveTime::MIN), 86_400),
            Frequency::Hourly => (
                date.and_hms_opt(anchor_local.hour(), 0, 0).unwrap_or(anchor_local),
                3_600,
            ),
            Frequency::Minutely => (
                date.and_hms_opt(anchor_local.hour(), anchor_local.minute(), 0)
                    .unwrap_or(anchor_local),
                60,
            ),
            Frequency::Secondly => (anchor_local.with_nanosecond(0).unwrap_or(anchor_local), 1),
            Frequency::Monthly | Frequency::Yearly => (anchor_local, 0),
        };

        let mut expansion = Self {
            rule,
            tz,
            anchor,
            anchor_local,
            after,
            options,
            base,
            step_secs: unit_secs * plan.interval,
            plan,
            stop_local: None,
            period: 0,
            pending: VecDeque::new(),
            counted: 0,
            empty_periods: 0,
            finished: false,
        };
        expansion.stop_local = expansion.compute_stop_local();

        // Without COUNT nothing before `after` needs to be counted, so start
        // at the period containing it. One period of slack absorbs DST folds.
        if rule.count.is_none()
            && let Some(after) = after
            && after > anchor
        {
            let after_local = after.with_timezone(&tz).naive_local();
            expansion.period = (expansion.index_containing(after_local) - 1).max(0);
        }

        expansion
    }

    fn compute_stop_local(&self) -> Option<NaiveDateTime> {
        // Zone offsets can move an instant's wall-clock time by up to a day
        let slack = TimeDelta::days(1);
        let until = self.rule.until.and_then(|until| match until {
            RRuleUntil::Date(d) => d.checked_add_days(Days::new(1)).map(|d| d.and_time(NaiveTime::MIN)),
            RRuleUntil::Floating(f) => Some(f),
            RRuleUntil::Utc(u) => u.naive_utc().checked_add_signed(slack),
        });
        let range = self
            .options
            .range_end
            .and_then(|end| end.naive_utc().checked_add_signed(slack));

        match (until, range) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn is_past_end(&self, instant: DateTime<Utc>) -> bool {
        let past_until = self.rule.until.is_some_and(|until| match until {
            RRuleUntil::Date(d) => instant.with_timezone(&self.tz).date_naive() > d,
            RRuleUntil::Floating(f) => instant.with_timezone(&self.tz).naive_local() > f,
            RRuleUntil::Utc(u) => instant > u,
        });
        past_until || self.options.range_end.is_some_and(|end| instant > end)
    }

    /// Index of the period containing `local` (may be negative).
    fn index_containing(&self, local: NaiveDateTime) -> i64 {
        match self.plan.freq {
            Frequency::Yearly => {
                (i64::from(local.year()) - i64::from(self.anchor_local.year()))
                    .div_euclid(self.plan.interval)
            }
            Frequency::Monthly => (months_since_epoch(local.date())
                - months_since_epoch(self.anchor_local.date()))
            .div_euclid(self.plan.interval),
            _ => local
                .signed_duration_since(self.base)
                .num_seconds()
                .div_euclid(self.step_secs),
        }
    }

    /// Index of the first fixed-length period starting at or after `local`.
    fn index_at_or_after(&self, local: NaiveDateTime) -> i64 {
        let secs = local.signed_duration_since(self.base).num_seconds();
        let index = secs.div_euclid(self.step_secs);
        if secs.rem_euclid(self.step_secs) == 0 {
            index
        } else {
            index + 1
        }
    }

    fn period_start(&self, index: i64) -> Option<NaiveDateTime> {
        let offset = index.checked_mul(self.plan.interval)?;
        match self.plan.freq {
            Frequency::Yearly => {
                let year = i64::from(self.anchor_local.year()).checked_add(offset)?;
                NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)
                    .map(|d| d.and_time(NaiveTime::MIN))
            }
            Frequency::Monthly => {
                let months = months_since_epoch(self.anchor_local.date()).checked_add(offset)?;
                let year = i32::try_from(months.div_euclid(12)).ok()?;
                let month = u32::try_from(months.rem_euclid(12)).ok()? + 1;
                NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN))
            }
            _ => {
                let secs = index.checked_mul(self.step_secs)?;
                self.base.checked_add_signed(TimeDelta::try_seconds(secs)?)
            }
        }
    }

    /// Days of a YEARLY, MONTHLY or WEEKLY period that pass every day filter.
    fn matching_days(&self, start: NaiveDate) -> Vec<NaiveDate> {
        let plan = &self.plan;
        let year = start.year();
        let days: Vec<NaiveDate> = match plan.freq {
            Frequency::Yearly => {
                let months: Vec<u32> = if plan.by_month.is_empty() {
                    (1..=12).collect()
                } else {
                    plan.by_month.clone()
                };
                months
                    .into_iter()
                    .flat_map(|m| {
                        (1..=days_in_month(year, m))
                            .filter_map(move |d| NaiveDate::from_ymd_opt(year, m, d))
                    })
                    .collect()
            }
            Frequency::Monthly => (1..=days_in_month(year, start.month()))
                .filter_map(|d| NaiveDate::from_ymd_opt(year, start.month(), d))
                .collect(),
            _ => (0..7)
                .filter_map(|offset| start.checked_add_days(Days::new(offset)))
                .collect(),
        };

        days.into_iter()
            .filter(|&d| plan.check_day(d) == DayCheck::Match)
            .collect()
    }

    fn fill_period(&self, start: NaiveDateTime) -> Option<PeriodFill> {
        let plan = &self.plan;

        if matches!(
            plan.freq,
            Frequency::Yearly | Frequency::Monthly | Frequency::Weekly
        ) {
            let candidates = self
                .matching_days(start.date())
                .into_iter()
                .flat_map(|d| plan.times.iter().map(move |&t| d.and_time(t)))
                .collect();
            return Some(PeriodFill::Candidates(candidates));
        }

        let date = start.date();
        match plan.check_day(date) {
            DayCheck::Match => {}
            DayCheck::MonthMiss => {
                return first_of_next_month(date)
                    .map(|d| PeriodFill::SkipTo(d.and_time(NaiveTime::MIN)));
            }
            DayCheck::DayMiss => {
                return date
                    .checked_add_days(Days::new(1))
                    .map(|d| PeriodFill::SkipTo(d.and_time(NaiveTime::MIN)));
            }
        }

        let (hour, minute, second) = (start.hour(), start.minute(), start.second());
        let next_hour = || {
            date.and_hms_opt(hour, 0, 0)
                .and_then(|t| t.checked_add_signed(TimeDelta::hours(1)))
        };

        let candidates = match plan.freq {
            Frequency::Daily => plan.times.iter().map(|&t| date.and_time(t)).collect(),
            Frequency::Hourly => {
                if !plan.by_hour.is_empty() && !plan.by_hour.contains(&hour) {
                    return next_hour().map(PeriodFill::SkipTo);
                }
                plan.by_minute
                    .iter()
                    .flat_map(|&m| {
                        plan.by_second
                            .iter()
                            .filter_map(move |&s| date.and_hms_opt(hour, m, s))
                    })
                    .collect()
            }
            Frequency::Minutely => {
                if !plan.by_hour.is_empty() && !plan.by_hour.contains(&hour) {
                    return next_hour().map(PeriodFill::SkipTo);
                }
                if !plan.by_minute.is_empty() && !plan.by_minute.contains(&minute) {
                    return Some(PeriodFill::Candidates(Vec::new()));
                }
                plan.by_second
                    .iter()
                    .filter_map(|&s| date.and_hms_opt(hour, minute, s))
                    .collect()
            }
            _ => {
                if !plan.by_hour.is_empty() && !plan.by_hour.contains(&hour) {
                    return next_hour().map(PeriodFill::SkipTo);
                }
                if !plan.by_minute.is_empty() && !plan.by_minute.contains(&minute) {
                    return date
                        .and_hms_opt(hour, minute, 0)
                        .and_then(|t| t.checked_add_signed(TimeDelta::minutes(1)))
                        .map(PeriodFill::SkipTo);
                }
                if !plan.by_second.is_empty() && !plan.by_second.contains(&second) {
                    return Some(PeriodFill::Candidates(Vec::new()));
                }
                vec![start]
            }
        };

        Some(PeriodFill::Candidates(candidates))
    }

    /// Expands the current period into `pending` and moves to the next one.
    fn advance(&mut self) -> Result<(), ExpansionError> {
        let index = self.period;
        let Some(start) = self.period_start(index) else {
            tracing::debug!(period = index, "Recurrence ran past the calendar range");
            self.finished = true;
            return Ok(());
        };

        if self.stop_local.is_some_and(|stop| start > stop) {
            self.finished = true;
            return Ok(());
        }

        let produced = match self.fill_period(start) {
            None => {
                self.finished = true;
                return Ok(());
            }
            Some(PeriodFill::SkipTo(target)) => {
                self.period = self.index_at_or_after(target).max(index + 1);
                false
            }
            Some(PeriodFill::Candidates(local_times)) => {
                self.period = index + 1;
                self.accept(local_times)
            }
        };

        if produced {
            self.empty_periods = 0;
        } else {
            self.empty_periods += 1;
            if self.empty_periods >= self.options.max_empty_periods {
                tracing::debug!(
                    rule = %self.rule,
                    limit = self.options.max_empty_periods,
                    "Recurrence produced no occurrence within bound"
                );
                self.finished = true;
                return Err(ExpansionError::Exhausted {
                    limit: self.options.max_empty_periods,
                });
            }
        }

        Ok(())
    }

    /// Applies BYSETPOS, the anchor, UNTIL/COUNT and the lower bound to one
    /// period's wall-clock candidates. Returns whether any occurrence existed.
    fn accept(&mut self, local_times: Vec<NaiveDateTime>) -> bool {
        let mut instants: Vec<DateTime<Utc>> = local_times
            .into_iter()
            .filter_map(|local| localize(self.tz, local).ok())
            .collect();
        instants.sort_unstable();
        instants.dedup();

        if !self.plan.by_setpos.is_empty() {
            instants = select_positions(&instants, &self.plan.by_setpos);
        }

        let mut produced = false;
        for instant in instants {
            if instant < self.anchor {
                continue;
            }
            if self.is_past_end(instant) {
                self.finished = true;
                break;
            }
            if self.rule.count.is_some_and(|count| self.counted >= count) {
                self.finished = true;
                break;
            }

            self.counted += 1;
            produced = true;

            if self.after.is_some_and(|after| instant <= after) {
                continue;
            }
            self.pending.push_back(instant);
        }

        if self.rule.count.is_some_and(|count| self.counted >= count) {
            self.finished = true;
        }

        tracing::trace!(
            period = self.period - 1,
            pending = self.pending.len(),
            counted = self.counted,
            "Expanded recurrence period"
        );

        produced
    }
}

impl Iterator for Expansion<'_> {
    type Item = Result<DateTime<Utc>, ExpansionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(instant) = self.pending.pop_front() {
                return Some(Ok(instant));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.advance() {
                return Some(Err(err));
            }
        }
    }
}
