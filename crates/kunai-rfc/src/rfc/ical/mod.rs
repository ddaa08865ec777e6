//! iCalendar recurrence support (RFC 5545 §3.3.10).
//!
//! - [`core`]: the `RRULE` value model and its canonical text form
//! - [`parse`]: rule text to [`core::RRule`], with domain validation
//! - [`expand`]: lazy expansion of a rule into ascending UTC instants

pub mod core;
pub mod expand;
pub mod parse;

#[cfg(test)]
mod tests;
