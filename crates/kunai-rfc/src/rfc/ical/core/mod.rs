//! iCalendar recurrence value types (RFC 5545).

mod rrule;

pub use rrule::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};
