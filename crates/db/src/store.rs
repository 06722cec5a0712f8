//! The Rule Store contract.
//!
//! [`RuleStore`] is the persistence seam consumed by the rule service.
//! Two implementations ship with the workspace: [`PgRuleStore`]
//! (production, sqlx/Postgres) and [`MemoryRuleStore`] (tests, local
//! development).
//!
//! [`PgRuleStore`]: crate::repositories::rule_repo::PgRuleStore
//! [`MemoryRuleStore`]: crate::memory::MemoryRuleStore

use async_trait::async_trait;
use joinwatch_core::rules::{ValidatedNewRule, ValidatedRuleFields};
use joinwatch_core::types::RuleId;

use crate::models::rule::NotificationRule;

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The id generated for a new rule already exists.
    #[error("Duplicate rule id: {0}")]
    DuplicateId(RuleId),

    /// The referenced rule does not exist.
    #[error("Rule not found: {0}")]
    NotFound(RuleId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract for notification rules.
///
/// All list operations order by creation time ascending (ties broken by
/// id); this ordering decides which rule wins destination
/// deduplication downstream. Every write is atomic with respect to a
/// single rule row.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Persist a new rule with a freshly generated id, `enabled = true`.
    async fn create(&self, rule: ValidatedNewRule) -> Result<NotificationRule, StoreError>;

    async fn find_by_id(&self, id: RuleId) -> Result<Option<NotificationRule>, StoreError>;

    /// All rules for an owner, creation order.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<NotificationRule>, StoreError>;

    /// Enabled rules for an owner, creation order.
    async fn list_enabled_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<NotificationRule>, StoreError>;

    /// Replace all mutable fields and refresh `updated_at`.
    async fn update(
        &self,
        id: RuleId,
        fields: ValidatedRuleFields,
    ) -> Result<NotificationRule, StoreError>;

    async fn delete(&self, id: RuleId) -> Result<(), StoreError>;

    /// Set the enabled flag. Returns `None` when no row was changed,
    /// letting the caller distinguish a lost race from success.
    async fn set_enabled(
        &self,
        id: RuleId,
        enabled: bool,
    ) -> Result<Option<NotificationRule>, StoreError>;

    /// Number of rules (enabled and disabled) owned by `owner_id`.
    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError>;
}
