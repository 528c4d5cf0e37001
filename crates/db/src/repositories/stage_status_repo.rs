//! Repository for per-stage status records.

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::import::StageStatusRow;

/// Column list for `import_stage_statuses`.
const COLUMNS: &str = "id, file_id, stage, status, critical_count, warning_count, updated_at";

/// Provides operations on the durable stage-status bag.
pub struct StageStatusRepo;

impl StageStatusRepo {
    /// Upsert the status for one stage of a session.
    pub async fn upsert(
        pool: &PgPool,
        file_id: DbId,
        stage: &str,
        status: &str,
        critical_count: i32,
        warning_count: i32,
    ) -> Result<StageStatusRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO import_stage_statuses \
                (file_id, stage, status, critical_count, warning_count) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (file_id, stage) DO UPDATE SET \
                status = EXCLUDED.status, \
                critical_count = EXCLUDED.critical_count, \
                warning_count = EXCLUDED.warning_count, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StageStatusRow>(&sql)
            .bind(file_id)
            .bind(stage)
            .bind(status)
            .bind(critical_count)
            .bind(warning_count)
            .fetch_one(pool)
            .await
    }

    /// Fetch the status for one stage, if any has been recorded.
    pub async fn find(
        pool: &PgPool,
        file_id: DbId,
        stage: &str,
    ) -> Result<Option<StageStatusRow>, sqlx::Error> {
        let sql =
            format!("SELECT {COLUMNS} FROM import_stage_statuses WHERE file_id = $1 AND stage = $2");
        sqlx::query_as::<_, StageStatusRow>(&sql)
            .bind(file_id)
            .bind(stage)
            .fetch_optional(pool)
            .await
    }

    /// List all recorded stage statuses for a session.
    pub async fn list_by_file(
        pool: &PgPool,
        file_id: DbId,
    ) -> Result<Vec<StageStatusRow>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_stage_statuses WHERE file_id = $1");
        sqlx::query_as::<_, StageStatusRow>(&sql)
            .bind(file_id)
            .fetch_all(pool)
            .await
    }
}
