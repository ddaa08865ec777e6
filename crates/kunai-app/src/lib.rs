//! Host-side tooling for kunai triggers.

pub mod error;
pub mod preview;
