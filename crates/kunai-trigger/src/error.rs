use kunai_rfc::rfc::ical::expand::ExpansionError;
use kunai_rfc::rfc::ical::parse::ParseError;
use thiserror::Error;

/// Trigger-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRecurrenceRule(#[from] ParseError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Recurrence produced no occurrence within {limit} consecutive periods")]
    ExpansionExhausted { limit: u32 },

    #[error("All of {limit} consecutive occurrences were excluded")]
    ExclusionDeadlock { limit: u32 },
}

impl From<ExpansionError> for TriggerError {
    fn from(err: ExpansionError) -> Self {
        match err {
            ExpansionError::Exhausted { limit } => Self::ExpansionExhausted { limit },
        }
    }
}

pub type TriggerResult<T> = std::result::Result<T, TriggerError>;
