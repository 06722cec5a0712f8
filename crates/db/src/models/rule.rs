//! Notification-rule entity model.

use std::collections::BTreeSet;

use joinwatch_core::types::{RuleId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A notification rule in its domain shape.
///
/// The id-list fields are sets: insertion order used at creation time is
/// irrelevant and duplicates never survive a round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRule {
    pub id: RuleId,
    pub owner_id: String,
    pub name: String,
    pub watched_channel_ids: BTreeSet<String>,
    /// Empty set means the rule applies to every user.
    pub target_user_ids: BTreeSet<String>,
    pub destination_channel_id: String,
    pub enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationRule {
    /// Whether this rule matches a join in `channel_id` by `user_id`.
    pub fn matches(&self, channel_id: &str, user_id: &str) -> bool {
        self.watched_channel_ids.contains(channel_id)
            && (self.target_user_ids.is_empty() || self.target_user_ids.contains(user_id))
    }
}

/// A raw row from the `notification_rules` table.
///
/// The two id-list columns hold JSON-encoded string arrays and are
/// decoded leniently by [`RuleRow::into_rule`].
#[derive(Debug, FromRow)]
pub struct RuleRow {
    pub id: RuleId,
    pub owner_id: String,
    pub name: String,
    pub watched_channel_ids: String,
    pub target_user_ids: String,
    pub destination_channel_id: String,
    pub enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RuleRow {
    /// Convert the raw row into the domain shape.
    ///
    /// A malformed list column must never fail a read: it decodes to an
    /// empty set and a warning is logged instead.
    pub fn into_rule(self) -> NotificationRule {
        let watched_channel_ids =
            parse_id_set(&self.watched_channel_ids, self.id, "watched_channel_ids");
        let target_user_ids = parse_id_set(&self.target_user_ids, self.id, "target_user_ids");
        NotificationRule {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            watched_channel_ids,
            target_user_ids,
            destination_channel_id: self.destination_channel_id,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Decode a JSON string-array column, falling back to an empty set.
fn parse_id_set(raw: &str, rule_id: RuleId, column: &str) -> BTreeSet<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            tracing::warn!(
                rule_id = %rule_id,
                column,
                error = %e,
                "Malformed id list in stored rule, treating as empty"
            );
            BTreeSet::new()
        }
    }
}

/// Encode an id set as the JSON array form stored in the list columns.
pub(crate) fn encode_id_set(ids: &BTreeSet<String>) -> String {
    serde_json::to_string(&ids.iter().collect::<Vec<_>>())
        .unwrap_or_else(|_| "[]".to_string())
}
