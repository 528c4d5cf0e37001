//! Repository for parsed import rows.

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::import::{CreateImportRow, ImportRow};

/// Column list for `import_rows`.
const COLUMNS: &str = "id, file_id, row_index, data, annotations, row_status, \
     raw_column_count, created_at, updated_at";

/// Provides CRUD and batch-correction operations for import rows.
pub struct ImportRowRepo;

impl ImportRowRepo {
    /// Insert a batch of parsed rows for a session.
    pub async fn batch_insert(
        pool: &PgPool,
        file_id: DbId,
        rows: &[CreateImportRow],
    ) -> Result<Vec<ImportRow>, sqlx::Error> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let sql = format!(
                "INSERT INTO import_rows \
                    (file_id, row_index, data, annotations, row_status, raw_column_count) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING {COLUMNS}"
            );
            let inserted = sqlx::query_as::<_, ImportRow>(&sql)
                .bind(file_id)
                .bind(row.row_index)
                .bind(&row.data)
                .bind(&row.annotations)
                .bind(&row.row_status)
                .bind(row.raw_column_count)
                .fetch_one(pool)
                .await?;
            results.push(inserted);
        }
        Ok(results)
    }

    /// Find one row by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportRow>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_rows WHERE id = $1");
        sqlx::query_as::<_, ImportRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch one page of rows for a session, optionally narrowed to a
    /// single row status. `offset` and `limit` are plain SQL paging.
    pub async fn fetch_page(
        pool: &PgPool,
        file_id: DbId,
        row_status: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ImportRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM import_rows \
             WHERE file_id = $1 AND ($2::text IS NULL OR row_status = $2) \
             ORDER BY row_index \
             OFFSET $3 LIMIT $4"
        );
        sqlx::query_as::<_, ImportRow>(&sql)
            .bind(file_id)
            .bind(row_status)
            .bind(offset)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Total row count for a session under the same optional filter.
    pub async fn count(
        pool: &PgPool,
        file_id: DbId,
        row_status: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM import_rows \
             WHERE file_id = $1 AND ($2::text IS NULL OR row_status = $2)",
        )
        .bind(file_id)
        .bind(row_status)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// List every row of a session in file order (for whole-file
    /// validation passes).
    pub async fn list_by_file(pool: &PgPool, file_id: DbId) -> Result<Vec<ImportRow>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_rows WHERE file_id = $1 ORDER BY row_index");
        sqlx::query_as::<_, ImportRow>(&sql)
            .bind(file_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite one cell of one row.
    pub async fn update_cell(
        pool: &PgPool,
        id: DbId,
        column: &str,
        value: &str,
    ) -> Result<Option<ImportRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_rows SET \
                data = jsonb_set(data, ARRAY[$2::text], to_jsonb($3::text)), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRow>(&sql)
            .bind(id)
            .bind(column)
            .bind(value)
            .fetch_optional(pool)
            .await
    }

    /// Propagate a correction: rewrite the cell in every row of the
    /// session whose current value equals `old_value`. Returns the
    /// touched rows in file order.
    pub async fn propagate_value(
        pool: &PgPool,
        file_id: DbId,
        column: &str,
        old_value: &str,
        new_value: &str,
    ) -> Result<Vec<ImportRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_rows SET \
                data = jsonb_set(data, ARRAY[$2::text], to_jsonb($4::text)), \
                updated_at = now() \
             WHERE file_id = $1 AND data->>$2 = $3 \
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, ImportRow>(&sql)
            .bind(file_id)
            .bind(column)
            .bind(old_value)
            .bind(new_value)
            .fetch_all(pool)
            .await?;
        rows.sort_by_key(|r| r.row_index);
        Ok(rows)
    }

    /// Replace a row's annotations and derived status after revalidation.
    pub async fn update_annotations(
        pool: &PgPool,
        id: DbId,
        annotations: &serde_json::Value,
        row_status: &str,
    ) -> Result<Option<ImportRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_rows SET \
                annotations = $2, \
                row_status = $3, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRow>(&sql)
            .bind(id)
            .bind(annotations)
            .bind(row_status)
            .fetch_optional(pool)
            .await
    }
}
