//! Rows of `achievement_references` and `achievement_status_history`.

use achievo_core::achievement::{AchievementReference, AchievementStatus, StatusHistoryEntry};
use achievo_core::ports::StoreError;
use achievo_core::types::{DbId, DocumentId, Timestamp};
use sqlx::FromRow;

fn parse_status(value: &str) -> Result<AchievementStatus, StoreError> {
    AchievementStatus::from_name(value)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown achievement status '{value}'")))
}

/// A row from the `achievement_references` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReferenceRow {
    pub id: DbId,
    pub student_id: DbId,
    pub document_id: DocumentId,
    pub status: String,
    pub submitted_at: Option<Timestamp>,
    pub verified_at: Option<Timestamp>,
    pub verified_by: Option<DbId>,
    pub rejection_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ReferenceRow> for AchievementReference {
    type Error = StoreError;

    fn try_from(row: ReferenceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            reference_id: row.id,
            student_id: row.student_id,
            document_id: row.document_id,
            status: parse_status(&row.status)?,
            submitted_at: row.submitted_at,
            verified_at: row.verified_at,
            verified_by: row.verified_by,
            rejection_note: row.rejection_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `achievement_status_history` table.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: DbId,
    pub reference_id: DbId,
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_by: DbId,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<HistoryRow> for StatusHistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            reference_id: row.reference_id,
            old_status: row.old_status.as_deref().map(parse_status).transpose()?,
            new_status: parse_status(&row.new_status)?,
            changed_by: row.changed_by,
            note: row.note,
            created_at: row.created_at,
        })
    }
}
