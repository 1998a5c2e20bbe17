//! Rows of the `notifications` inbox table.

use achievo_core::notification::{InboxEntry, NotificationType};
use achievo_core::ports::StoreError;
use achievo_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub user_id: DbId,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TryFrom<NotificationRow> for InboxEntry {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationType::from_name(&row.notification_type).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "unknown notification type '{}'",
                row.notification_type
            ))
        })?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            kind,
            title: row.title,
            message: row.message,
            payload: row.payload,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}
