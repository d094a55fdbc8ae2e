/// Saved vehicle records are keyed by a random UUID that survives plate edits.
pub type RecordId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
