//! Rule management service.
//!
//! Validates input, enforces the per-owner quota, and answers the
//! "which enabled rules match this join" query. The service never
//! caches rules across calls: every evaluation re-reads the store, so
//! toggling a rule takes effect on the next event.

use std::sync::Arc;

use joinwatch_core::error::CoreError;
use joinwatch_core::rules::{self, NewRule, RuleUpdate, MAX_RULES_PER_OWNER};
use joinwatch_core::types::RuleId;
use joinwatch_db::store::{RuleStore, StoreError};
use joinwatch_db::NotificationRule;

/// Validated CRUD and matching over notification rules.
#[derive(Clone)]
pub struct RuleService {
    store: Arc<dyn RuleStore>,
}

impl RuleService {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Create a rule from caller input.
    ///
    /// Normalizes and validates first (collecting every violation),
    /// then checks the owner quota before any store write. New rules
    /// start enabled.
    pub async fn create_rule(&self, input: NewRule) -> Result<NotificationRule, CoreError> {
        let validated = rules::validate_new_rule(input)?;

        let count = self
            .store
            .count_by_owner(&validated.owner_id)
            .await
            .map_err(map_store_error)?;
        if count as usize >= MAX_RULES_PER_OWNER {
            return Err(CoreError::LimitExceeded {
                owner_id: validated.owner_id,
                limit: MAX_RULES_PER_OWNER,
            });
        }

        self.store.create(validated).await.map_err(map_store_error)
    }

    /// Replace all mutable fields of an existing rule.
    ///
    /// Existence is checked before validation so a caller referencing a
    /// deleted rule sees `NotFound` rather than a validation report.
    pub async fn update_rule(
        &self,
        id: RuleId,
        input: RuleUpdate,
    ) -> Result<NotificationRule, CoreError> {
        if self
            .store
            .find_by_id(id)
            .await
            .map_err(map_store_error)?
            .is_none()
        {
            return Err(not_found(id));
        }
        let fields = rules::validate_rule_update(input)?;
        self.store.update(id, fields).await.map_err(map_store_error)
    }

    pub async fn delete_rule(&self, id: RuleId) -> Result<(), CoreError> {
        self.store.delete(id).await.map_err(map_store_error)
    }

    /// Enable or disable a rule.
    ///
    /// With `explicit` the flag is set to that value; without it the
    /// current value flips. If the store reports no row changed despite
    /// the existence check just above, that inconsistency surfaces as
    /// [`CoreError::Conflict`]; it is never downgraded to `NotFound`.
    pub async fn toggle_rule(
        &self,
        id: RuleId,
        explicit: Option<bool>,
    ) -> Result<NotificationRule, CoreError> {
        let current = self
            .store
            .find_by_id(id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| not_found(id))?;

        let enabled = explicit.unwrap_or(!current.enabled);
        match self
            .store
            .set_enabled(id, enabled)
            .await
            .map_err(map_store_error)?
        {
            Some(rule) => Ok(rule),
            None => Err(CoreError::Conflict(format!(
                "rule {id} existed but the store changed no row during toggle"
            ))),
        }
    }

    /// List an owner's rules, enabled-only unless `include_disabled`.
    pub async fn list_rules(
        &self,
        owner_id: &str,
        include_disabled: bool,
    ) -> Result<Vec<NotificationRule>, CoreError> {
        let result = if include_disabled {
            self.store.list_by_owner(owner_id).await
        } else {
            self.store.list_enabled_by_owner(owner_id).await
        };
        result.map_err(map_store_error)
    }

    /// Enabled rules matching a join of `user_id` into `channel_id`.
    ///
    /// Order is the store's creation order; the evaluator relies on it
    /// to decide which rule wins a shared destination.
    pub async fn applicable_rules(
        &self,
        owner_id: &str,
        channel_id: &str,
        user_id: &str,
    ) -> Result<Vec<NotificationRule>, CoreError> {
        let enabled = self
            .store
            .list_enabled_by_owner(owner_id)
            .await
            .map_err(map_store_error)?;
        Ok(enabled
            .into_iter()
            .filter(|rule| rule.matches(channel_id, user_id))
            .collect())
    }
}

fn not_found(id: RuleId) -> CoreError {
    CoreError::NotFound {
        entity: "NotificationRule",
        id: id.to_string(),
    }
}

fn map_store_error(e: StoreError) -> CoreError {
    match e {
        StoreError::NotFound(id) => not_found(id),
        StoreError::DuplicateId(id) => {
            CoreError::Conflict(format!("generated rule id {id} already exists"))
        }
        StoreError::Database(e) => CoreError::Store(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use joinwatch_core::rules::{ValidatedNewRule, ValidatedRuleFields};
    use joinwatch_db::MemoryRuleStore;

    fn service() -> (Arc<MemoryRuleStore>, RuleService) {
        let store = Arc::new(MemoryRuleStore::new());
        (store.clone(), RuleService::new(store))
    }

    fn input(owner: &str, name: &str, destination: &str) -> NewRule {
        NewRule {
            owner_id: owner.into(),
            name: name.into(),
            watched_channel_ids: vec!["200".into()],
            target_user_ids: vec![],
            destination_channel_id: destination.into(),
        }
    }

    #[tokio::test]
    async fn created_rule_round_trips_through_the_store() {
        let (store, service) = service();
        let created = service.create_rule(input("100", "Crew", "300")).await.unwrap();

        assert!(created.enabled);
        assert_eq!(created.owner_id, "100");
        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn quota_is_enforced_before_any_write() {
        let (store, service) = service();
        for i in 0..MAX_RULES_PER_OWNER {
            service
                .create_rule(input("100", &format!("Rule {i}"), "300"))
                .await
                .unwrap();
        }
        // Disable one: the quota counts disabled rules too.
        let listed = service.list_rules("100", true).await.unwrap();
        service.toggle_rule(listed[0].id, Some(false)).await.unwrap();

        let err = service
            .create_rule(input("100", "One too many", "300"))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::LimitExceeded { limit, .. } => assert_eq!(limit, 50));
        assert_eq!(store.count_by_owner("100").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn invalid_input_reports_all_violations_without_writing() {
        let (store, service) = service();
        let err = service
            .create_rule(NewRule {
                owner_id: "bad".into(),
                name: "".into(),
                watched_channel_ids: vec![],
                target_user_ids: vec![],
                destination_channel_id: "300".into(),
            })
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::Validation { violations } => {
            assert!(violations.len() >= 3);
        });
        assert_eq!(store.count_by_owner("bad").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_missing_rule_is_not_found_before_validation() {
        let (_, service) = service();
        let err = service
            .update_rule(
                RuleId::new_v4(),
                RuleUpdate {
                    name: "".into(), // invalid, but NotFound must win
                    watched_channel_ids: vec![],
                    target_user_ids: vec![],
                    destination_channel_id: "".into(),
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn toggle_flips_without_explicit_value() {
        let (_, service) = service();
        let rule = service.create_rule(input("100", "Crew", "300")).await.unwrap();

        let toggled = service.toggle_rule(rule.id, None).await.unwrap();
        assert!(!toggled.enabled);
        let toggled = service.toggle_rule(rule.id, None).await.unwrap();
        assert!(toggled.enabled);

        let explicit = service.toggle_rule(rule.id, Some(true)).await.unwrap();
        assert!(explicit.enabled);
    }

    #[tokio::test]
    async fn toggle_missing_rule_is_not_found() {
        let (_, service) = service();
        let err = service.toggle_rule(RuleId::new_v4(), None).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn applicable_rules_match_watch_set_and_targets_in_creation_order() {
        let (_, service) = service();
        let all_users = service.create_rule(input("100", "All", "300")).await.unwrap();
        let targeted = service
            .create_rule(NewRule {
                target_user_ids: vec!["400".into()],
                ..input("100", "Targeted", "301")
            })
            .await
            .unwrap();
        service
            .create_rule(NewRule {
                watched_channel_ids: vec!["999".into()],
                ..input("100", "Elsewhere", "302")
            })
            .await
            .unwrap();

        let matched = service.applicable_rules("100", "200", "400").await.unwrap();
        assert_eq!(
            matched.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![all_users.id, targeted.id]
        );

        // A user outside the target set only matches the catch-all rule.
        let matched = service.applicable_rules("100", "200", "401").await.unwrap();
        assert_eq!(matched.iter().map(|r| r.id).collect::<Vec<_>>(), vec![all_users.id]);
    }

    #[tokio::test]
    async fn disabled_rules_never_match() {
        let (_, service) = service();
        let rule = service.create_rule(input("100", "Crew", "300")).await.unwrap();
        service.toggle_rule(rule.id, Some(false)).await.unwrap();

        let matched = service.applicable_rules("100", "200", "400").await.unwrap();
        assert!(matched.is_empty());
    }

    // Store stub reproducing the toggle race: the rule exists for the
    // read but no row changes on the write.
    struct VanishingStore {
        rule: NotificationRule,
    }

    #[async_trait]
    impl RuleStore for VanishingStore {
        async fn create(&self, _: ValidatedNewRule) -> Result<NotificationRule, StoreError> {
            unimplemented!("not used")
        }
        async fn find_by_id(&self, _: RuleId) -> Result<Option<NotificationRule>, StoreError> {
            Ok(Some(self.rule.clone()))
        }
        async fn list_by_owner(&self, _: &str) -> Result<Vec<NotificationRule>, StoreError> {
            Ok(vec![])
        }
        async fn list_enabled_by_owner(&self, _: &str) -> Result<Vec<NotificationRule>, StoreError> {
            Ok(vec![])
        }
        async fn update(
            &self,
            id: RuleId,
            _: ValidatedRuleFields,
        ) -> Result<NotificationRule, StoreError> {
            Err(StoreError::NotFound(id))
        }
        async fn delete(&self, _: RuleId) -> Result<(), StoreError> {
            Ok(())
        }
        async fn set_enabled(
            &self,
            _: RuleId,
            _: bool,
        ) -> Result<Option<NotificationRule>, StoreError> {
            Ok(None)
        }
        async fn count_by_owner(&self, _: &str) -> Result<i64, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn toggle_race_surfaces_as_conflict_not_as_not_found() {
        let store = Arc::new(MemoryRuleStore::new());
        let seeded = RuleService::new(store)
            .create_rule(input("100", "Crew", "300"))
            .await
            .unwrap();

        let racy = RuleService::new(Arc::new(VanishingStore { rule: seeded.clone() }));
        let err = racy.toggle_rule(seeded.id, None).await.unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }
}
