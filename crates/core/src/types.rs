/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Boxed error carried as the `source` of user-facing errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
