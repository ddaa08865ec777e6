//! Recurrence-rule triggers: the firing state machine, exclusion screening
//! and misfire recovery layered over the RRULE expander in `kunai-rfc`.

pub mod config;
pub mod constants;
pub mod error;
pub mod exclusion;
pub mod key;
pub mod misfire;
pub mod state;
pub mod trigger;

pub use config::{RepeatCount, TriggerConfig};
pub use error::{TriggerError, TriggerResult};
pub use exclusion::{ExcludedInstants, ExclusionFilter};
pub use key::{JobKey, TriggerKey};
pub use misfire::{MisfireAction, MisfireInstruction, resolve_misfire};
pub use state::{CompletionReason, FireCursor, TriggerFault, TriggerState};
pub use trigger::{RecurrenceRuleTrigger, compare_fire_order};
