//! Repository layer.
//!
//! Each repository wraps a `PgPool` and provides async CRUD methods
//! over one table.

pub mod rule_repo;

pub use rule_repo::PgRuleStore;
