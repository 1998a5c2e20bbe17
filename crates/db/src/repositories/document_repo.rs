//! Repository for the `achievement_documents` table (document database).

use achievo_core::achievement::{Attachment, DocumentPatch, NewDocument};
use achievo_core::types::{DocumentId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::document::DocumentRow;

/// Column list for `achievement_documents` queries.
const COLUMNS: &str = "id, owner_student_id, achievement_type, title, description, details, \
    attachments, tags, achieved_date, points, is_deleted, deleted_at, created_at, updated_at";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &PgPool, input: &NewDocument) -> Result<DocumentRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO achievement_documents \
                (owner_student_id, achievement_type, title, description, details, \
                 attachments, tags, achieved_date, points) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(input.owner_student_id)
            .bind(input.achievement_type.as_str())
            .bind(&input.title)
            .bind(&input.description)
            .bind(Json(&input.details))
            .bind(Json(&input.attachments))
            .bind(&input.tags)
            .bind(input.achieved_date)
            .bind(input.points)
            .fetch_one(pool)
            .await
    }

    /// Find a document. Soft-deleted rows are only returned when
    /// `include_deleted` is set.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DocumentId,
        include_deleted: bool,
    ) -> Result<Option<DocumentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM achievement_documents \
             WHERE id = $1 AND ($2 OR NOT is_deleted)"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, ids: &[DocumentId]) -> Result<Vec<DocumentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM achievement_documents \
             WHERE id = ANY($1) AND NOT is_deleted"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Apply a patch to a live document. Only non-`None` fields change.
    pub async fn update(
        pool: &PgPool,
        id: DocumentId,
        patch: &DocumentPatch,
        at: Timestamp,
    ) -> Result<Option<DocumentRow>, sqlx::Error> {
        let query = format!(
            "UPDATE achievement_documents SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                details = COALESCE($4, details), \
                tags = COALESCE($5, tags), \
                achieved_date = COALESCE($6, achieved_date), \
                points = COALESCE($7, points), \
                updated_at = $8 \
             WHERE id = $1 AND NOT is_deleted \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .bind(patch.title.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.details.as_ref().map(Json))
            .bind(patch.tags.as_deref())
            .bind(patch.achieved_date)
            .bind(patch.points)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Append one attachment to the JSONB array of a live document.
    pub async fn append_attachment(
        pool: &PgPool,
        id: DocumentId,
        attachment: &Attachment,
    ) -> Result<Option<DocumentRow>, sqlx::Error> {
        let query = format!(
            "UPDATE achievement_documents SET \
                attachments = attachments || $2, \
                updated_at = $3 \
             WHERE id = $1 AND NOT is_deleted \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .bind(Json([attachment]))
            .bind(attachment.uploaded_at)
            .fetch_optional(pool)
            .await
    }

    /// Returns `true` if a live document was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DocumentId, at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE achievement_documents \
             SET is_deleted = true, deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Physically remove a document. Compensation for a failed create only.
    pub async fn hard_delete(pool: &PgPool, id: DocumentId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM achievement_documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
