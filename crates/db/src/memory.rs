//! In-memory [`RuleStore`] used by tests and local development.
//!
//! Keeps rules in insertion order behind a `tokio::sync::Mutex`, which
//! also gives the per-rule write atomicity the contract requires.

use async_trait::async_trait;
use chrono::Utc;
use joinwatch_core::rules::{ValidatedNewRule, ValidatedRuleFields};
use joinwatch_core::types::RuleId;
use tokio::sync::Mutex;

use crate::models::rule::NotificationRule;
use crate::store::{RuleStore, StoreError};

/// Non-persistent rule store.
#[derive(Default)]
pub struct MemoryRuleStore {
    // Insertion order doubles as creation order.
    rules: Mutex<Vec<NotificationRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-built rule, bypassing id generation. Test helper.
    pub async fn insert_raw(&self, rule: NotificationRule) {
        self.rules.lock().await.push(rule);
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn create(&self, rule: ValidatedNewRule) -> Result<NotificationRule, StoreError> {
        let id = RuleId::new_v4();
        let mut rules = self.rules.lock().await;
        if rules.iter().any(|r| r.id == id) {
            return Err(StoreError::DuplicateId(id));
        }
        let now = Utc::now();
        let created = NotificationRule {
            id,
            owner_id: rule.owner_id,
            name: rule.fields.name,
            watched_channel_ids: rule.fields.watched_channel_ids,
            target_user_ids: rule.fields.target_user_ids,
            destination_channel_id: rule.fields.destination_channel_id,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        rules.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<NotificationRule>, StoreError> {
        let rules = self.rules.lock().await;
        Ok(rules.iter().find(|r| r.id == id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<NotificationRule>, StoreError> {
        let rules = self.rules.lock().await;
        Ok(rules
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_enabled_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<NotificationRule>, StoreError> {
        let rules = self.rules.lock().await;
        Ok(rules
            .iter()
            .filter(|r| r.owner_id == owner_id && r.enabled)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: RuleId,
        fields: ValidatedRuleFields,
    ) -> Result<NotificationRule, StoreError> {
        let mut rules = self.rules.lock().await;
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        rule.name = fields.name;
        rule.watched_channel_ids = fields.watched_channel_ids;
        rule.target_user_ids = fields.target_user_ids;
        rule.destination_channel_id = fields.destination_channel_id;
        rule.updated_at = Utc::now();
        Ok(rule.clone())
    }

    async fn delete(&self, id: RuleId) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().await;
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn set_enabled(
        &self,
        id: RuleId,
        enabled: bool,
    ) -> Result<Option<NotificationRule>, StoreError> {
        let mut rules = self.rules.lock().await;
        match rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                rule.updated_at = Utc::now();
                Ok(Some(rule.clone()))
            }
            None => Ok(None),
        }
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError> {
        let rules = self.rules.lock().await;
        Ok(rules.iter().filter(|r| r.owner_id == owner_id).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeSet;

    fn new_rule(owner: &str, name: &str) -> ValidatedNewRule {
        ValidatedNewRule {
            owner_id: owner.into(),
            fields: ValidatedRuleFields {
                name: name.into(),
                watched_channel_ids: BTreeSet::from(["200".to_string()]),
                target_user_ids: BTreeSet::new(),
                destination_channel_id: "300".into(),
            },
        }
    }

    #[tokio::test]
    async fn create_then_find_returns_equal_record() {
        let store = MemoryRuleStore::new();
        let created = store.create(new_rule("100", "First")).await.unwrap();
        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn listing_preserves_creation_order() {
        let store = MemoryRuleStore::new();
        let a = store.create(new_rule("100", "A")).await.unwrap();
        let b = store.create(new_rule("100", "B")).await.unwrap();
        let c = store.create(new_rule("other", "C")).await.unwrap();

        let listed = store.list_by_owner("100").await.unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id, b.id]);
        assert_ne!(listed[0].id, c.id);
    }

    #[tokio::test]
    async fn enabled_listing_filters_but_count_does_not() {
        let store = MemoryRuleStore::new();
        let a = store.create(new_rule("100", "A")).await.unwrap();
        let b = store.create(new_rule("100", "B")).await.unwrap();
        store.set_enabled(a.id, false).await.unwrap();

        let enabled = store.list_enabled_by_owner("100").await.unwrap();
        assert_eq!(enabled.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b.id]);
        assert_eq!(store.count_by_owner("100").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_missing_rule_is_not_found() {
        let store = MemoryRuleStore::new();
        let err = store.delete(RuleId::new_v4()).await.unwrap_err();
        assert_matches!(err, StoreError::NotFound(_));
    }

    #[tokio::test]
    async fn set_enabled_on_missing_rule_returns_none() {
        let store = MemoryRuleStore::new();
        let result = store.set_enabled(RuleId::new_v4(), true).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_replaces_all_mutable_fields() {
        let store = MemoryRuleStore::new();
        let created = store.create(new_rule("100", "Before")).await.unwrap();

        let updated = store
            .update(
                created.id,
                ValidatedRuleFields {
                    name: "After".into(),
                    watched_channel_ids: BTreeSet::from(["210".to_string()]),
                    target_user_ids: BTreeSet::from(["400".to_string()]),
                    destination_channel_id: "310".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "After");
        assert_eq!(updated.destination_channel_id, "310");
        assert_eq!(updated.owner_id, "100");
        assert!(updated.updated_at >= created.updated_at);
    }
}
