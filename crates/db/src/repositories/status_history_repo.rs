//! Repository for the `achievement_status_history` table.

use achievo_core::achievement::AchievementStatus;
use achievo_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::reference::HistoryRow;

const COLUMNS: &str = "id, reference_id, old_status, new_status, changed_by, note, created_at";

pub struct StatusHistoryRepo;

impl StatusHistoryRepo {
    /// Append an entry. Always called inside the transaction that changed
    /// the reference.
    pub async fn record(
        conn: &mut PgConnection,
        reference_id: DbId,
        old_status: Option<AchievementStatus>,
        new_status: AchievementStatus,
        changed_by: DbId,
        note: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO achievement_status_history \
                (reference_id, old_status, new_status, changed_by, note) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(reference_id)
        .bind(old_status.map(AchievementStatus::as_str))
        .bind(new_status.as_str())
        .bind(changed_by)
        .bind(note)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn list_for_reference(
        pool: &PgPool,
        reference_id: DbId,
    ) -> Result<Vec<HistoryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM achievement_status_history \
             WHERE reference_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, HistoryRow>(&query)
            .bind(reference_id)
            .fetch_all(pool)
            .await
    }
}
