//! RFC 5545 recurrence rules: the `RRULE` value model, its parser and the
//! expander that turns a rule into fire instants.

pub mod rfc;
