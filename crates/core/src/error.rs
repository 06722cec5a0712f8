//! Business error taxonomy shared across the workspace.

use serde::Serialize;

/// A single field-level validation violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Rule input failed validation. Carries every violated constraint,
    /// not just the first one encountered.
    #[error("Validation failed: {}", format_violations(.violations))]
    Validation { violations: Vec<FieldViolation> },

    /// The owner already has the maximum number of rules.
    #[error("Owner {owner_id} has reached the limit of {limit} rules")]
    LimitExceeded { owner_id: String, limit: usize },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The store reported unexpected state despite a prior existence
    /// check. Surfaced as-is; never downgraded to `NotFound`.
    #[error("Repository conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl CoreError {
    /// Build a validation error from a non-empty violation list.
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self::Validation { violations }
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
