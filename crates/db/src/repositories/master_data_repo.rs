//! Repository for canonical master data and candidate resolutions.

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::master_data::{
    CreateMasterDataEntry, CreateMasterDataResolution, MasterDataEntry, MasterDataResolution,
};

/// Column list for `master_data`.
const MASTER_COLUMNS: &str = "id, parent_type, value, display, created_at";

/// Column list for `master_data_resolutions`.
const RESOLUTION_COLUMNS: &str = "id, file_id, field_name, current_value, updated_id, \
     updated_value, is_new_insert, marked_at";

/// Provides lookups against the canonical store and persistence for
/// accepted resolutions.
pub struct MasterDataRepo;

impl MasterDataRepo {
    /// Insert a canonical record.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMasterDataEntry,
    ) -> Result<MasterDataEntry, sqlx::Error> {
        let sql = format!(
            "INSERT INTO master_data (parent_type, value, display) \
             VALUES ($1, $2, $3) \
             RETURNING {MASTER_COLUMNS}"
        );
        sqlx::query_as::<_, MasterDataEntry>(&sql)
            .bind(&input.parent_type)
            .bind(&input.value)
            .bind(&input.display)
            .fetch_one(pool)
            .await
    }

    /// List canonical records, optionally scoped to one parent type.
    pub async fn list(
        pool: &PgPool,
        parent_type: Option<&str>,
    ) -> Result<Vec<MasterDataEntry>, sqlx::Error> {
        let sql = format!(
            "SELECT {MASTER_COLUMNS} FROM master_data \
             WHERE ($1::text IS NULL OR parent_type = $1) \
             ORDER BY display"
        );
        sqlx::query_as::<_, MasterDataEntry>(&sql)
            .bind(parent_type)
            .fetch_all(pool)
            .await
    }

    /// Parent types that currently hold canonical records.
    pub async fn distinct_parent_types(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT parent_type FROM master_data \
             WHERE parent_type IS NOT NULL \
             ORDER BY 1",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    /// Distinct values of one column across a session's rows that have
    /// no canonical counterpart. These become reconciliation candidates.
    pub async fn missing_values(
        pool: &PgPool,
        file_id: DbId,
        column: &str,
        parent_type: Option<&str>,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT data->>$2 FROM import_rows \
             WHERE file_id = $1 \
               AND data->>$2 IS NOT NULL AND data->>$2 <> '' \
               AND data->>$2 NOT IN ( \
                   SELECT value FROM master_data \
                   WHERE ($3::text IS NULL OR parent_type = $3) \
               ) \
             ORDER BY 1",
        )
        .bind(file_id)
        .bind(column)
        .bind(parent_type)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    /// Record a batch of accepted resolutions for a session.
    pub async fn insert_resolutions(
        pool: &PgPool,
        file_id: DbId,
        resolutions: &[CreateMasterDataResolution],
    ) -> Result<Vec<MasterDataResolution>, sqlx::Error> {
        let mut results = Vec::with_capacity(resolutions.len());
        for resolution in resolutions {
            let sql = format!(
                "INSERT INTO master_data_resolutions \
                    (file_id, field_name, current_value, updated_id, updated_value, is_new_insert) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING {RESOLUTION_COLUMNS}"
            );
            let row = sqlx::query_as::<_, MasterDataResolution>(&sql)
                .bind(file_id)
                .bind(&resolution.field_name)
                .bind(&resolution.current_value)
                .bind(&resolution.updated_id)
                .bind(&resolution.updated_value)
                .bind(resolution.is_new_insert)
                .fetch_one(pool)
                .await?;
            results.push(row);
        }
        Ok(results)
    }

    /// List the resolutions already recorded for one field of a session.
    pub async fn list_resolutions(
        pool: &PgPool,
        file_id: DbId,
        field_name: &str,
    ) -> Result<Vec<MasterDataResolution>, sqlx::Error> {
        let sql = format!(
            "SELECT {RESOLUTION_COLUMNS} FROM master_data_resolutions \
             WHERE file_id = $1 AND field_name = $2 \
             ORDER BY current_value"
        );
        sqlx::query_as::<_, MasterDataResolution>(&sql)
            .bind(file_id)
            .bind(field_name)
            .fetch_all(pool)
            .await
    }
}
