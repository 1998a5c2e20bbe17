//! Read-only queries over `students` and `advisors`.
//!
//! `students.advisor_id` references `advisors.id` (the advisor record), not
//! the advisor's user id.

use achievo_core::types::DbId;
use sqlx::PgPool;

pub struct DirectoryRepo;

impl DirectoryRepo {
    pub async fn student_user(pool: &PgPool, student_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT user_id FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn student_advisor(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let advisor: Option<Option<DbId>> =
            sqlx::query_scalar("SELECT advisor_id FROM students WHERE id = $1")
                .bind(student_id)
                .fetch_optional(pool)
                .await?;
        Ok(advisor.flatten())
    }

    pub async fn student_by_user(pool: &PgPool, user_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM students WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn advisor_by_user(pool: &PgPool, user_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM advisors WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn advisor_user(pool: &PgPool, advisor_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT user_id FROM advisors WHERE id = $1")
            .bind(advisor_id)
            .fetch_optional(pool)
            .await
    }

    /// Student record ids assigned to an advisor, ascending.
    pub async fn advisees(pool: &PgPool, advisor_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM students WHERE advisor_id = $1 ORDER BY id")
            .bind(advisor_id)
            .fetch_all(pool)
            .await
    }
}
