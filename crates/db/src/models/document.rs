//! Rows of `achievement_documents`.

use achievo_core::achievement::{AchievementDocument, AchievementType, Attachment};
use achievo_core::details::AchievementDetails;
use achievo_core::ports::StoreError;
use achievo_core::types::{DbId, DocumentId, Timestamp};
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `achievement_documents` table.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub owner_student_id: DbId,
    pub achievement_type: String,
    pub title: String,
    pub description: String,
    pub details: Json<AchievementDetails>,
    pub attachments: Json<Vec<Attachment>>,
    pub tags: Vec<String>,
    pub achieved_date: Option<NaiveDate>,
    pub points: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<DocumentRow> for AchievementDocument {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let achievement_type = AchievementType::parse(&row.achievement_type)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let details = row.details.0;
        if details.specific.achievement_type() != achievement_type {
            return Err(StoreError::Corrupt(format!(
                "document {} is '{achievement_type}' but its details are '{}'",
                row.id,
                details.specific.achievement_type()
            )));
        }
        Ok(Self {
            document_id: row.id,
            owner_student_id: row.owner_student_id,
            achievement_type,
            title: row.title,
            description: row.description,
            details,
            attachments: row.attachments.0,
            tags: row.tags,
            achieved_date: row.achieved_date,
            points: row.points,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
