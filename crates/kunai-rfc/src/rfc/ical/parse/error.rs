//! Recurrence rule parsing error types.

use std::fmt;

/// Result type for recurrence rule parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error type for recurrence rule parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of error.
    pub kind: ParseErrorKind,
    /// Byte offset of the offending rule part (0-based).
    pub offset: usize,
    /// Additional context about the error.
    pub context: Option<String>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)?;
        if let Some(ref ctx) = self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Rule text is empty.
    Empty,
    /// Rule part is not a `NAME=VALUE` pair.
    MalformedPart,
    /// Rule part name is not defined by RFC 5545.
    UnknownPart,
    /// Rule part appears more than once.
    DuplicatePart,
    /// FREQ is missing.
    MissingFrequency,
    /// Invalid frequency.
    InvalidFrequency,
    /// INTERVAL is not a positive integer.
    InvalidInterval,
    /// COUNT is not a positive integer.
    InvalidCount,
    /// UNTIL is not a DATE or DATE-TIME.
    InvalidUntil,
    /// UNTIL and COUNT are mutually exclusive.
    UntilCountConflict,
    /// Invalid weekday.
    InvalidWeekday,
    /// A BYxxx list is empty or holds a non-numeric entry.
    InvalidList,
    /// A BYxxx value lies outside its domain.
    ValueOutOfRange,
    /// BYDAY ordinals outside MONTHLY/YEARLY, or combined with BYWEEKNO.
    OrdinalNotAllowed,
    /// A BYxxx part is not allowed with the rule's frequency.
    PartNotAllowed,
    /// BYSETPOS without another BYxxx part.
    SetPosWithoutFilter,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty recurrence rule"),
            Self::MalformedPart => write!(f, "malformed rule part"),
            Self::UnknownPart => write!(f, "unknown rule part"),
            Self::DuplicatePart => write!(f, "duplicate rule part"),
            Self::MissingFrequency => write!(f, "missing FREQ"),
            Self::InvalidFrequency => write!(f, "invalid frequency"),
            Self::InvalidInterval => write!(f, "invalid INTERVAL"),
            Self::InvalidCount => write!(f, "invalid COUNT"),
            Self::InvalidUntil => write!(f, "invalid UNTIL"),
            Self::UntilCountConflict => write!(f, "UNTIL and COUNT are mutually exclusive"),
            Self::InvalidWeekday => write!(f, "invalid weekday"),
            Self::InvalidList => write!(f, "invalid value list"),
            Self::ValueOutOfRange => write!(f, "value out of range"),
            Self::OrdinalNotAllowed => write!(f, "BYDAY ordinal not allowed here"),
            Self::PartNotAllowed => write!(f, "rule part not allowed with this frequency"),
            Self::SetPosWithoutFilter => write!(f, "BYSETPOS requires another BYxxx part"),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
