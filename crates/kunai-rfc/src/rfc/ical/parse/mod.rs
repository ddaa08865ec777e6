//! Recurrence rule parsing (RFC 5545 §3.3.10).
//!
//! Rule text is parsed once into an [`RRule`](super::core::RRule); every part
//! is range-checked and the cross-part restrictions of the RFC are enforced,
//! so a successfully parsed rule is always safe to expand.

mod error;
mod rrule;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use rrule::{parse_rrule, validate_rrule};
