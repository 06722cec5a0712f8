//! Event and intent envelopes flowing through the notifier.

use joinwatch_core::types::RuleId;
use serde::Deserialize;

/// A presence-transition event as delivered by the gateway
/// subscription. Either channel side may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceUpdate {
    pub guild_id: String,
    pub user_id: String,
    pub previous_channel_id: Option<String>,
    pub new_channel_id: Option<String>,
}

/// One not-yet-delivered notification, derived from a matching rule.
///
/// Transient: built per join event, collapsed by destination before
/// dispatch, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIntent {
    pub guild_id: String,
    pub watched_channel_id: String,
    pub user_id: String,
    pub destination_channel_id: String,
    pub rule_id: RuleId,
    pub rule_name: String,
}
