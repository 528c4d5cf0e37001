//! Repository for the correction audit log.

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::import::{CorrectionLog, CreateCorrectionLog};

/// Column list for `correction_log`.
const COLUMNS: &str = "id, file_id, row_id, column_name, old_value, new_value, \
     is_batch_update, validation_type, affected_count, created_at";

/// Provides append and listing operations for the correction log.
pub struct CorrectionLogRepo;

impl CorrectionLogRepo {
    /// Append one committed correction.
    pub async fn create(
        pool: &PgPool,
        input: &CreateCorrectionLog,
    ) -> Result<CorrectionLog, sqlx::Error> {
        let sql = format!(
            "INSERT INTO correction_log \
                (file_id, row_id, column_name, old_value, new_value, \
                 is_batch_update, validation_type, affected_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CorrectionLog>(&sql)
            .bind(input.file_id)
            .bind(input.row_id)
            .bind(&input.column_name)
            .bind(&input.old_value)
            .bind(&input.new_value)
            .bind(input.is_batch_update)
            .bind(&input.validation_type)
            .bind(input.affected_count)
            .fetch_one(pool)
            .await
    }

    /// List a session's corrections, oldest first.
    pub async fn list_by_file(
        pool: &PgPool,
        file_id: DbId,
    ) -> Result<Vec<CorrectionLog>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM correction_log WHERE file_id = $1 ORDER BY id");
        sqlx::query_as::<_, CorrectionLog>(&sql)
            .bind(file_id)
            .fetch_all(pool)
            .await
    }
}
