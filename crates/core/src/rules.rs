//! Notification-rule field constraints, normalization, and validation.
//!
//! Validation collects every violated constraint before failing so the
//! command layer can present the complete list to the user in one pass.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::{CoreError, FieldViolation};
use crate::snowflake;

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Maximum number of rules a single owner may have (enabled or disabled).
pub const MAX_RULES_PER_OWNER: usize = 50;

/// Watched voice channels per rule.
pub const MIN_WATCHED_CHANNELS: usize = 1;
pub const MAX_WATCHED_CHANNELS: usize = 10;

/// Target users per rule. An empty set means "all users".
pub const MAX_TARGET_USERS: usize = 50;

/// Rule name length bounds (after trimming).
pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Caller-supplied input for creating a rule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub owner_id: String,
    pub name: String,
    pub watched_channel_ids: Vec<String>,
    pub target_user_ids: Vec<String>,
    pub destination_channel_id: String,
}

/// Caller-supplied input for a full-field rule update.
///
/// The owner is immutable, so it is absent here.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleUpdate {
    pub name: String,
    pub watched_channel_ids: Vec<String>,
    pub target_user_ids: Vec<String>,
    pub destination_channel_id: String,
}

/// Normalized and constraint-checked mutable rule fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRuleFields {
    pub name: String,
    pub watched_channel_ids: BTreeSet<String>,
    pub target_user_ids: BTreeSet<String>,
    pub destination_channel_id: String,
}

/// A [`NewRule`] that passed validation, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNewRule {
    pub owner_id: String,
    pub fields: ValidatedRuleFields,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Normalize and validate creation input.
///
/// Trims the name, canonicalizes all ids, and collapses the channel and
/// user lists into sets (callers may send duplicates; set semantics
/// apply). Returns a [`CoreError::Validation`] carrying every violation
/// when any constraint fails.
pub fn validate_new_rule(input: NewRule) -> Result<ValidatedNewRule, CoreError> {
    let mut violations = Vec::new();

    let owner_id = snowflake::normalize(&input.owner_id);
    if !snowflake::is_snowflake(&owner_id) {
        violations.push(FieldViolation {
            field: "owner_id",
            message: format!("'{owner_id}' is not a valid platform id"),
        });
    }

    let fields = validate_fields(
        input.name,
        input.watched_channel_ids,
        input.target_user_ids,
        input.destination_channel_id,
        &mut violations,
    );

    if violations.is_empty() {
        Ok(ValidatedNewRule { owner_id, fields })
    } else {
        Err(CoreError::validation(violations))
    }
}

/// Normalize and validate update input. Same constraints as creation,
/// minus the owner (which never changes).
pub fn validate_rule_update(input: RuleUpdate) -> Result<ValidatedRuleFields, CoreError> {
    let mut violations = Vec::new();
    let fields = validate_fields(
        input.name,
        input.watched_channel_ids,
        input.target_user_ids,
        input.destination_channel_id,
        &mut violations,
    );
    if violations.is_empty() {
        Ok(fields)
    } else {
        Err(CoreError::validation(violations))
    }
}

/// Check the mutable fields shared by create and update, appending one
/// violation per failed constraint.
fn validate_fields(
    name: String,
    watched: Vec<String>,
    targets: Vec<String>,
    destination: String,
    violations: &mut Vec<FieldViolation>,
) -> ValidatedRuleFields {
    let name = name.trim().to_string();
    let name_chars = name.chars().count();
    if name_chars < NAME_MIN_LEN {
        violations.push(FieldViolation {
            field: "name",
            message: "must not be empty".into(),
        });
    }
    if name_chars > NAME_MAX_LEN {
        violations.push(FieldViolation {
            field: "name",
            message: format!("must be at most {NAME_MAX_LEN} characters"),
        });
    }

    let watched_channel_ids = normalize_id_set(&watched, "watched_channel_ids", violations);
    if watched_channel_ids.len() < MIN_WATCHED_CHANNELS {
        violations.push(FieldViolation {
            field: "watched_channel_ids",
            message: "at least one watched channel is required".into(),
        });
    }
    if watched_channel_ids.len() > MAX_WATCHED_CHANNELS {
        violations.push(FieldViolation {
            field: "watched_channel_ids",
            message: format!("at most {MAX_WATCHED_CHANNELS} watched channels are allowed"),
        });
    }

    let target_user_ids = normalize_id_set(&targets, "target_user_ids", violations);
    if target_user_ids.len() > MAX_TARGET_USERS {
        violations.push(FieldViolation {
            field: "target_user_ids",
            message: format!("at most {MAX_TARGET_USERS} target users are allowed"),
        });
    }

    let destination_channel_id = snowflake::normalize(&destination);
    if !snowflake::is_snowflake(&destination_channel_id) {
        violations.push(FieldViolation {
            field: "destination_channel_id",
            message: format!("'{destination_channel_id}' is not a valid platform id"),
        });
    }

    ValidatedRuleFields {
        name,
        watched_channel_ids,
        target_user_ids,
        destination_channel_id,
    }
}

/// Canonicalize a list of ids into a set, flagging each malformed entry.
fn normalize_id_set(
    raw: &[String],
    field: &'static str,
    violations: &mut Vec<FieldViolation>,
) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for entry in raw {
        let id = snowflake::normalize(entry);
        if snowflake::is_snowflake(&id) {
            set.insert(id);
        } else {
            violations.push(FieldViolation {
                field,
                message: format!("'{id}' is not a valid platform id"),
            });
        }
    }
    set
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
