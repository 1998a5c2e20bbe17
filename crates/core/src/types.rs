/// Relational primary keys (references, students, advisors, users) are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Opaque identifier assigned by the document store.
pub type DocumentId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
