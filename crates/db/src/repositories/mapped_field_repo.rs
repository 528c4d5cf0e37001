//! Repository for committed column-to-field mappings.

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::import::{CreateMappedField, MappedField};

/// Column list for `mapped_fields`.
const COLUMNS: &str = "id, file_id, source_column, target_field, required, created_at";

/// Provides operations on the committed mapping set of a session.
pub struct MappedFieldRepo;

impl MappedFieldRepo {
    /// Replace the mapping set for a session. Committing a mapping is
    /// all-or-nothing, so the previous set is cleared first.
    pub async fn replace_for_file(
        pool: &PgPool,
        file_id: DbId,
        mappings: &[CreateMappedField],
    ) -> Result<Vec<MappedField>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM mapped_fields WHERE file_id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;
        let mut results = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let sql = format!(
                "INSERT INTO mapped_fields (file_id, source_column, target_field, required) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING {COLUMNS}"
            );
            let row = sqlx::query_as::<_, MappedField>(&sql)
                .bind(file_id)
                .bind(&mapping.source_column)
                .bind(&mapping.target_field)
                .bind(mapping.required)
                .fetch_one(&mut *tx)
                .await?;
            results.push(row);
        }
        tx.commit().await?;
        Ok(results)
    }

    /// List the committed mappings for a session, in source-column order.
    pub async fn list_by_file(
        pool: &PgPool,
        file_id: DbId,
    ) -> Result<Vec<MappedField>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM mapped_fields WHERE file_id = $1 ORDER BY source_column"
        );
        sqlx::query_as::<_, MappedField>(&sql)
            .bind(file_id)
            .fetch_all(pool)
            .await
    }
}
