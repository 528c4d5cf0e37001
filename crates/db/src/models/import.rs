//! Models for import sessions, stored rows, column mappings, and the
//! correction log.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tabula_core::types::{DbId, Timestamp};

// ── Import Files ─────────────────────────────────────────────────────

/// A row from the `import_files` table: one uploaded file / session.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportFile {
    pub id: DbId,
    pub file_name: String,
    pub file_extension: String,
    pub byte_size: i64,
    /// Original header row, in file order.
    pub headers: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an import file record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportFile {
    pub file_name: String,
    pub file_extension: String,
    pub byte_size: i64,
    pub headers: serde_json::Value,
}

// ── Stage Statuses ───────────────────────────────────────────────────

/// A row from the `import_stage_statuses` table: the durable per-stage
/// status bag for one session.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StageStatusRow {
    pub id: DbId,
    pub file_id: DbId,
    pub stage: String,
    pub status: String,
    pub critical_count: i32,
    pub warning_count: i32,
    pub updated_at: Timestamp,
}

// ── Import Rows ──────────────────────────────────────────────────────

/// A row from the `import_rows` table: one Record plus its parsed
/// cell annotations and derived row status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportRow {
    pub id: DbId,
    pub file_id: DbId,
    pub row_index: i32,
    pub data: serde_json::Value,
    /// Legacy-shaped annotation list (see `tabula_core::annotation`).
    pub annotations: serde_json::Value,
    pub row_status: String,
    /// Cell count before padding, used by the row-length check.
    pub raw_column_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a parsed row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportRow {
    pub row_index: i32,
    pub data: serde_json::Value,
    pub annotations: serde_json::Value,
    pub row_status: String,
    pub raw_column_count: i32,
}

// ── Mapped Fields ────────────────────────────────────────────────────

/// A row from the `mapped_fields` table: one committed source-column to
/// target-field assignment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MappedField {
    pub id: DbId,
    pub file_id: DbId,
    pub source_column: String,
    pub target_field: String,
    pub required: bool,
    pub created_at: Timestamp,
}

/// DTO for committing a mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMappedField {
    pub source_column: String,
    pub target_field: String,
    pub required: bool,
}

// ── Correction Log ───────────────────────────────────────────────────

/// A row from the `correction_log` table: one committed correction,
/// the audit/undo substrate.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CorrectionLog {
    pub id: DbId,
    pub file_id: DbId,
    pub row_id: DbId,
    pub column_name: String,
    pub old_value: String,
    pub new_value: String,
    pub is_batch_update: bool,
    pub validation_type: String,
    /// Rows actually touched (the originating row plus propagation).
    pub affected_count: i32,
    pub created_at: Timestamp,
}

/// DTO for logging a correction.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCorrectionLog {
    pub file_id: DbId,
    pub row_id: DbId,
    pub column_name: String,
    pub old_value: String,
    pub new_value: String,
    pub is_batch_update: bool,
    pub validation_type: String,
    pub affected_count: i32,
}
