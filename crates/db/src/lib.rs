//! PostgreSQL adapters for the achievement core.
//!
//! Two databases are involved: the relational reference database (users,
//! students, advisors, achievement references, history, notifications) and
//! the document database holding achievement documents. Each has its own
//! pool and its own migration set.

use sqlx::postgres::PgPoolOptions;

mod error;
pub mod models;
pub mod repositories;
pub mod stores;

pub use error::store_error;
pub use stores::{PgDirectory, PgDocumentStore, PgInbox, PgReferenceStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the reference database migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    let mut migrator = sqlx::migrate!("./migrations");
    // Both migration sets may share one database in development.
    migrator.set_ignore_missing(true);
    migrator.run(pool).await
}

/// Apply the document database migrations.
pub async fn run_document_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    let mut migrator = sqlx::migrate!("./document_migrations");
    migrator.set_ignore_missing(true);
    migrator.run(pool).await
}
