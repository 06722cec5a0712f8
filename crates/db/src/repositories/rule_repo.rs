//! Postgres repository for the `notification_rules` table.

use async_trait::async_trait;
use joinwatch_core::rules::{ValidatedNewRule, ValidatedRuleFields};
use joinwatch_core::types::RuleId;
use sqlx::PgPool;

use crate::models::rule::{encode_id_set, NotificationRule, RuleRow};
use crate::store::{RuleStore, StoreError};

/// Column list for `notification_rules` queries.
const COLUMNS: &str = "\
    id, owner_id, name, watched_channel_ids, target_user_ids, \
    destination_channel_id, enabled, created_at, updated_at";

/// [`RuleStore`] backed by Postgres.
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn create(&self, rule: ValidatedNewRule) -> Result<NotificationRule, StoreError> {
        let id = RuleId::new_v4();
        let query = format!(
            "INSERT INTO notification_rules \
                 (id, owner_id, name, watched_channel_ids, target_user_ids, \
                  destination_channel_id, enabled) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .bind(&rule.owner_id)
            .bind(&rule.fields.name)
            .bind(encode_id_set(&rule.fields.watched_channel_ids))
            .bind(encode_id_set(&rule.fields.target_user_ids))
            .bind(&rule.fields.destination_channel_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                    StoreError::DuplicateId(id)
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(row.into_rule())
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<NotificationRule>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM notification_rules WHERE id = $1");
        let row = sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RuleRow::into_rule))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<NotificationRule>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_rules \
             WHERE owner_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, RuleRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RuleRow::into_rule).collect())
    }

    async fn list_enabled_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<NotificationRule>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_rules \
             WHERE owner_id = $1 AND enabled = TRUE \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, RuleRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RuleRow::into_rule).collect())
    }

    async fn update(
        &self,
        id: RuleId,
        fields: ValidatedRuleFields,
    ) -> Result<NotificationRule, StoreError> {
        let query = format!(
            "UPDATE notification_rules SET \
                 name = $2, \
                 watched_channel_ids = $3, \
                 target_user_ids = $4, \
                 destination_channel_id = $5, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .bind(&fields.name)
            .bind(encode_id_set(&fields.watched_channel_ids))
            .bind(encode_id_set(&fields.target_user_ids))
            .bind(&fields.destination_channel_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RuleRow::into_rule).ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: RuleId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM notification_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn set_enabled(
        &self,
        id: RuleId,
        enabled: bool,
    ) -> Result<Option<NotificationRule>, StoreError> {
        let query = format!(
            "UPDATE notification_rules SET enabled = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .bind(enabled)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RuleRow::into_rule))
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM notification_rules WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.unwrap_or(0))
    }
}
