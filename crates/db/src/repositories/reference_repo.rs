//! Repository for the `achievement_references` table.

use achievo_core::achievement::{AchievementStatus, Transition};
use achievo_core::types::{DbId, DocumentId};
use sqlx::{PgConnection, PgPool};

use crate::models::reference::ReferenceRow;

/// Column list for `achievement_references` queries.
const COLUMNS: &str = "id, student_id, document_id, status, submitted_at, verified_at, \
    verified_by, rejection_note, created_at, updated_at";

/// Filter shared by the list and count queries. Tombstones are never listed.
const LIST_FILTER: &str = "status <> 'deleted' \
    AND ($1::text IS NULL OR status = $1) \
    AND ($2::bigint[] IS NULL OR student_id = ANY($2))";

pub struct ReferenceRepo;

impl ReferenceRepo {
    /// Insert a `draft` reference. Fails with a unique violation if the
    /// document is already referenced.
    pub async fn create(
        conn: &mut PgConnection,
        student_id: DbId,
        document_id: DocumentId,
    ) -> Result<ReferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO achievement_references (student_id, document_id, status) \
             VALUES ($1, $2, 'draft') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(student_id)
            .bind(document_id)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ReferenceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM achievement_references WHERE id = $1");
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a transition if the row still holds `transition.source()`.
    ///
    /// Returns `None` when no row matched. Timestamp and verifier columns are
    /// only ever filled, never cleared.
    pub async fn transition(
        conn: &mut PgConnection,
        id: DbId,
        transition: &Transition,
    ) -> Result<Option<ReferenceRow>, sqlx::Error> {
        let (submitted_at, verified_at, verified_by) = match transition {
            Transition::Submit { at } => (Some(*at), None, None),
            Transition::Verify { at, by } | Transition::Reject { at, by, .. } => {
                (None, Some(*at), Some(*by))
            }
            Transition::Delete { .. } => (None, None, None),
        };
        let query = format!(
            "UPDATE achievement_references SET \
                status = $3, \
                submitted_at = COALESCE($4, submitted_at), \
                verified_at = COALESCE($5, verified_at), \
                verified_by = COALESCE($6, verified_by), \
                rejection_note = COALESCE($7, rejection_note), \
                updated_at = $8 \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(id)
            .bind(transition.source().as_str())
            .bind(transition.target().as_str())
            .bind(submitted_at)
            .bind(verified_at)
            .bind(verified_by)
            .bind(transition.note())
            .bind(transition.at())
            .fetch_optional(conn)
            .await
    }

    /// One page of live references, newest first.
    pub async fn list(
        pool: &PgPool,
        status: Option<AchievementStatus>,
        student_ids: Option<&[DbId]>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReferenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM achievement_references \
             WHERE {LIST_FILTER} \
             ORDER BY created_at DESC, id ASC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(status.map(AchievementStatus::as_str))
            .bind(student_ids)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        status: Option<AchievementStatus>,
        student_ids: Option<&[DbId]>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM achievement_references WHERE {LIST_FILTER}");
        let row: (i64,) = sqlx::query_as(&query)
            .bind(status.map(AchievementStatus::as_str))
            .bind(student_ids)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
