//! Models for the stage-advance override audit trail.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tabula_core::types::{DbId, Timestamp};

/// A row from the `override_audit` table: one explicit user decision to
/// advance past advisory issues. Distinguishable from a clean pass by
/// construction.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OverrideAudit {
    pub id: DbId,
    pub file_id: DbId,
    pub stage: String,
    pub warnings_outstanding: i32,
    pub reason: String,
    pub created_at: Timestamp,
}

/// DTO for recording an override.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOverrideAudit {
    pub file_id: DbId,
    pub stage: String,
    pub warnings_outstanding: i32,
    pub reason: String,
}
