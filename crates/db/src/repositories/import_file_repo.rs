//! Repository for import files (one row per upload session).

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::import::{CreateImportFile, ImportFile};

/// Column list for `import_files`.
const COLUMNS: &str =
    "id, file_name, file_extension, byte_size, headers, created_at, updated_at";

/// Provides CRUD operations for import files.
pub struct ImportFileRepo;

impl ImportFileRepo {
    /// Create a new import file record.
    pub async fn create(
        pool: &PgPool,
        input: &CreateImportFile,
    ) -> Result<ImportFile, sqlx::Error> {
        let sql = format!(
            "INSERT INTO import_files (file_name, file_extension, byte_size, headers) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportFile>(&sql)
            .bind(&input.file_name)
            .bind(&input.file_extension)
            .bind(input.byte_size)
            .bind(&input.headers)
            .fetch_one(pool)
            .await
    }

    /// Find an import file by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportFile>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_files WHERE id = $1");
        sqlx::query_as::<_, ImportFile>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a session and everything hanging off it (rows, mappings,
    /// statuses, logs cascade via FK).
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_files WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
