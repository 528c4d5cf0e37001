//! Models for canonical master data and submitted resolutions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tabula_core::types::{DbId, Timestamp};

/// A row from the `master_data` table: one canonical reference record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MasterDataEntry {
    pub id: DbId,
    pub parent_type: Option<String>,
    pub value: String,
    pub display: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a canonical record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMasterDataEntry {
    pub parent_type: Option<String>,
    pub value: String,
    pub display: String,
}

/// A row from the `master_data_resolutions` table: one accepted
/// candidate resolution.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MasterDataResolution {
    pub id: DbId,
    pub file_id: DbId,
    pub field_name: String,
    pub current_value: String,
    pub updated_id: String,
    pub updated_value: String,
    pub is_new_insert: bool,
    pub marked_at: Timestamp,
}

/// DTO for recording a resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMasterDataResolution {
    pub field_name: String,
    pub current_value: String,
    pub updated_id: String,
    pub updated_value: String,
    pub is_new_insert: bool,
}
