//! Joinwatch rule evaluation and notification delivery.
//!
//! This crate is the runtime core of the notifier:
//!
//! - [`RuleService`] — validated CRUD over notification rules plus the
//!   "which rules apply to this join" query.
//! - [`JoinEvaluator`] — consumes presence updates, keeps only genuine
//!   joins, deduplicates matches by destination, and fans intents out.
//! - [`NotificationDispatcher`] — resolves intents against live remote
//!   state, renders the embed, and sends it with per-class retry and
//!   duplicate suppression.
//! - [`SuppressionMap`] — the TTL-windowed duplicate guard.

pub mod dispatcher;
pub mod evaluator;
pub mod intent;
pub mod service;
pub mod suppression;

pub use dispatcher::{DispatchError, DispatcherConfig, NotificationDispatcher, RetryAfterUnit};
pub use evaluator::{JoinEvaluator, Notifier};
pub use intent::{NotificationIntent, PresenceUpdate};
pub use service::RuleService;
pub use suppression::{Clock, ManualClock, SuppressionKey, SuppressionMap, SystemClock};
