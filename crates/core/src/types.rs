/// Notification-rule primary keys are UUID v4, generated at creation.
pub type RuleId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
