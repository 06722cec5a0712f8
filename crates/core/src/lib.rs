//! Joinwatch domain core.
//!
//! Shared types, the error taxonomy, notification-rule validation, and
//! voice presence-transition classification. This crate has no I/O; the
//! database and gateway crates build on it.

pub mod error;
pub mod presence;
pub mod rules;
pub mod snowflake;
pub mod types;

pub use error::{CoreError, FieldViolation};
pub use presence::VoiceTransition;
pub use rules::{NewRule, RuleUpdate};
