//! Persistence layer for notification rules.
//!
//! Exposes the [`RuleStore`] contract, its Postgres implementation
//! [`PgRuleStore`], and an in-memory implementation
//! [`MemoryRuleStore`] used by tests and local development.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use memory::MemoryRuleStore;
pub use models::rule::NotificationRule;
pub use repositories::rule_repo::PgRuleStore;
pub use store::{RuleStore, StoreError};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
