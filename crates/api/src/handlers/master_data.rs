//! Handlers for canonical master data and reconciliation candidates.
//!
//! Candidates are distinct observed values with no canonical
//! counterpart; submitting a resolution maps each one onto an existing
//! record or inserts it as new under the `"-100"` sentinel, then
//! rewrites the session's rows to the canonical value.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use tabula_core::error::CoreError;
use tabula_core::reconcile::{MasterDataCandidate, Section, NEW_INSERT_ID};
use tabula_core::types::DbId;

use tabula_db::models::master_data::{
    CreateMasterDataEntry, CreateMasterDataResolution, MasterDataEntry, MasterDataResolution,
};
use tabula_db::repositories::{ImportFileRepo, ImportRowRepo, MappedFieldRepo, MasterDataRepo};

use crate::error::{AppError, AppResult};
use crate::query::ParentTypeParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ── Canonical store ──────────────────────────────────────────────────

/// GET /api/v1/master-data?parent_type=
///
/// List canonical records, optionally scoped to one parent type.
pub async fn list_master_data(
    State(state): State<AppState>,
    Query(params): Query<ParentTypeParams>,
) -> AppResult<Json<DataResponse<Vec<MasterDataEntry>>>> {
    let entries = MasterDataRepo::list(&state.pool, params.parent_type.as_deref()).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/master-data
///
/// Insert a canonical record.
pub async fn create_master_data(
    State(state): State<AppState>,
    Json(input): Json<CreateMasterDataEntry>,
) -> AppResult<(StatusCode, Json<DataResponse<MasterDataEntry>>)> {
    let entry = MasterDataRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

// ── Sections ─────────────────────────────────────────────────────────

/// GET /api/v1/import/{id}/master-data/sections
///
/// The ordered reconciliation queue for a session: one section per
/// mapped column whose target field names a canonical parent type.
/// Empty until a mapping is committed.
pub async fn list_sections(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Section>>>> {
    ImportFileRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportFile",
            id,
        }))?;

    let mapped = MappedFieldRepo::list_by_file(&state.pool, id).await?;
    let parent_types = MasterDataRepo::distinct_parent_types(&state.pool).await?;

    let sections: Vec<Section> = mapped
        .into_iter()
        .filter(|m| parent_types.iter().any(|t| t == &m.target_field))
        .map(|m| Section {
            column_name: m.source_column,
            parent_type: Some(m.target_field.clone()),
            alias_name: m.target_field,
        })
        .collect();

    Ok(Json(DataResponse { data: sections }))
}

// ── Candidates ───────────────────────────────────────────────────────

/// Query parameters for the candidate listing.
#[derive(Debug, Deserialize)]
pub struct CandidateParams {
    /// Column of the session's rows to reconcile.
    pub field: String,
    pub parent_type: Option<String>,
}

/// GET /api/v1/import/{id}/master-data/candidates?field=&parent_type=
///
/// List the distinct values of one column that have no canonical
/// counterpart. Values already resolved in this session come back
/// marked.
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<CandidateParams>,
) -> AppResult<Json<DataResponse<Vec<MasterDataCandidate>>>> {
    ImportFileRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportFile",
            id,
        }))?;

    let missing = MasterDataRepo::missing_values(
        &state.pool,
        id,
        &params.field,
        params.parent_type.as_deref(),
    )
    .await?;
    let resolved = MasterDataRepo::list_resolutions(&state.pool, id, &params.field).await?;

    let apply_resolution =
        |candidate: &mut MasterDataCandidate, resolution: &MasterDataResolution| {
            candidate.updated_id = Some(resolution.updated_id.clone());
            candidate.updated_value = Some(resolution.updated_value.clone());
            candidate.is_new_insert = resolution.is_new_insert;
            candidate.is_marked = true;
        };

    let mut candidates: Vec<MasterDataCandidate> = missing
        .iter()
        .map(|value| {
            let mut candidate = MasterDataCandidate::new(value, params.parent_type.clone());
            if let Some(resolution) = resolved.iter().find(|r| &r.current_value == value) {
                apply_resolution(&mut candidate, resolution);
            }
            candidate
        })
        .collect();

    // Accepted resolutions make their value canonical (or rewrite the
    // rows), so they no longer surface as missing. Union them back in
    // marked, so the section's history stays visible.
    for resolution in &resolved {
        if !missing.iter().any(|v| v == &resolution.current_value) {
            let mut candidate =
                MasterDataCandidate::new(&resolution.current_value, params.parent_type.clone());
            apply_resolution(&mut candidate, resolution);
            candidates.push(candidate);
        }
    }
    candidates.sort_by(|a, b| a.current_value.cmp(&b.current_value));

    Ok(Json(DataResponse { data: candidates }))
}

// ── Resolutions ──────────────────────────────────────────────────────

/// One candidate decision within a submission batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInput {
    pub current_value: String,
    /// Canonical record ID; absent or empty means "insert as new".
    pub updated_id: Option<String>,
    pub updated_value: Option<String>,
}

/// Request body for a resolution submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResolutionsRequest {
    pub field_name: String,
    pub parent_type: Option<String>,
    pub resolutions: Vec<ResolutionInput>,
}

/// POST /api/v1/import/{id}/master-data/resolutions
///
/// Accept a batch of candidate decisions. New inserts get the sentinel
/// ID and become canonical records under their original value; mappings
/// to existing records rewrite the session's rows to the canonical
/// value.
pub async fn submit_resolutions(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<SubmitResolutionsRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<MasterDataResolution>>>)> {
    ImportFileRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportFile",
            id,
        }))?;

    if request.resolutions.is_empty() {
        return Err(AppError::BadRequest("empty resolution batch".into()));
    }

    let mut create = Vec::with_capacity(request.resolutions.len());
    for input in &request.resolutions {
        let is_new_insert = input.updated_id.as_deref().map_or(true, str::is_empty);
        if is_new_insert {
            // New canonical record under the original value.
            MasterDataRepo::create(
                &state.pool,
                &CreateMasterDataEntry {
                    parent_type: request.parent_type.clone(),
                    value: input.current_value.clone(),
                    display: input.current_value.clone(),
                },
            )
            .await?;
            create.push(CreateMasterDataResolution {
                field_name: request.field_name.clone(),
                current_value: input.current_value.clone(),
                updated_id: NEW_INSERT_ID.to_string(),
                updated_value: input.current_value.clone(),
                is_new_insert: true,
            });
        } else {
            let updated_value = input.updated_value.clone().ok_or_else(|| {
                AppError::BadRequest(format!(
                    "resolution for '{}' selects an existing record but carries no value",
                    input.current_value
                ))
            })?;
            create.push(CreateMasterDataResolution {
                field_name: request.field_name.clone(),
                current_value: input.current_value.clone(),
                updated_id: input.updated_id.clone().unwrap_or_default(),
                updated_value,
                is_new_insert: false,
            });
        }
    }

    let resolutions = MasterDataRepo::insert_resolutions(&state.pool, id, &create).await?;

    // Rewrite rows whose canonical value differs from the observed one.
    for resolution in &resolutions {
        if resolution.updated_value != resolution.current_value {
            ImportRowRepo::propagate_value(
                &state.pool,
                id,
                &request.field_name,
                &resolution.current_value,
                &resolution.updated_value,
            )
            .await?;
        }
    }

    tracing::info!(
        file_id = id,
        field = %request.field_name,
        count = resolutions.len(),
        "Master-data resolutions submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: resolutions }),
    ))
}
