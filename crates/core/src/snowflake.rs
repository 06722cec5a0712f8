//! Canonicalization and validation of platform numeric ids.
//!
//! Guild, channel, and user identifiers are snowflake-style decimal
//! strings. Inputs are normalized (trimmed) before validation so that
//! the same id always compares equal regardless of caller formatting.

/// Maximum length of a snowflake id (a u64 rendered in decimal).
pub const MAX_SNOWFLAKE_LEN: usize = 20;

/// Trim surrounding whitespace, producing the canonical string form.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_string()
}

/// Whether a string is a well-formed platform id: 1 to 20 ASCII digits,
/// not all zeros.
pub fn is_snowflake(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_SNOWFLAKE_LEN {
        return false;
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    value.bytes().any(|b| b != b'0')
}
