/// Database row identifier used across all tables.
pub type DbId = i64;

/// UTC timestamp type used for all temporal columns.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
