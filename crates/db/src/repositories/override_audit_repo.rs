//! Repository for stage-advance override audit records.

use sqlx::PgPool;
use tabula_core::types::DbId;

use crate::models::audit::{CreateOverrideAudit, OverrideAudit};

/// Column list for `override_audit`.
const COLUMNS: &str = "id, file_id, stage, warnings_outstanding, reason, created_at";

/// Provides append and listing operations for override audits.
pub struct OverrideAuditRepo;

impl OverrideAuditRepo {
    /// Record an explicit advance-with-warnings decision.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOverrideAudit,
    ) -> Result<OverrideAudit, sqlx::Error> {
        let sql = format!(
            "INSERT INTO override_audit (file_id, stage, warnings_outstanding, reason) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OverrideAudit>(&sql)
            .bind(input.file_id)
            .bind(&input.stage)
            .bind(input.warnings_outstanding)
            .bind(&input.reason)
            .fetch_one(pool)
            .await
    }

    /// List a session's overrides, oldest first.
    pub async fn list_by_file(
        pool: &PgPool,
        file_id: DbId,
    ) -> Result<Vec<OverrideAudit>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM override_audit WHERE file_id = $1 ORDER BY id");
        sqlx::query_as::<_, OverrideAudit>(&sql)
            .bind(file_id)
            .fetch_all(pool)
            .await
    }
}
