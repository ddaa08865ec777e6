//! Recurrence expansion.
//!
//! Turns a parsed [`RRule`](super::core::RRule) and an anchor instant into an
//! ascending, lazily produced sequence of UTC instants. Calendar arithmetic is
//! done on wall-clock time in a caller-supplied zone.

mod calendar;
mod expander;
mod timezone;

pub use expander::{Expansion, ExpansionError, ExpansionOptions, expand, next_after};
pub use timezone::{ConversionError, TimeZoneResolver, localize};
