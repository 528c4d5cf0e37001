//! Persistence layer: the durable import-session store.
//!
//! Replaces ambient browser-side storage with an explicit Postgres
//! schema: sessions are created on upload and torn down on
//! completion or cancel. Repositories follow a thin struct-per-table
//! convention with explicit column lists and `query_as`.

pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

/// Shared alias so callers do not depend on the concrete driver type.
pub type DbPool = sqlx::PgPool;

/// Create a connection pool for the given database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Cheap connectivity probe used by the health endpoint.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
