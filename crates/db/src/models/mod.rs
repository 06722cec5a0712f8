//! Entity models mapped onto the persisted schema.

pub mod rule;
