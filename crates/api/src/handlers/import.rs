//! Handlers for the staged import wizard.
//!
//! Provides endpoints for file upload (multipart), paginated stage data,
//! mapping commit, rule-engine runs, cell corrections with batch
//! propagation, gated stage advancement, and session cancellation.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tabula_core::annotation::{
    annotations_to_wire, parse_status_message, row_status, AnnotationKind, CellAnnotation,
};
use tabula_core::checks::{
    quality, run_stage_checks, CheckConfig, CheckStatus, ColumnMapping, FileMeta, MappingInput,
    RowsInput, StageInput, TargetField,
};
use tabula_core::classifier::{classify, ClassifiedReport};
use tabula_core::error::CoreError;
use tabula_core::pagination::{display_range_at, DisplayRange};
use tabula_core::record::{cell_str, Record};
use tabula_core::stage::{Stage, StageStatus};
use tabula_core::types::DbId;

use tabula_db::models::audit::CreateOverrideAudit;
use tabula_db::models::import::{
    CreateCorrectionLog, CreateImportFile, CreateImportRow, CreateMappedField, ImportFile,
    ImportRow, StageStatusRow,
};
use tabula_db::repositories::{
    CorrectionLogRepo, ImportFileRepo, ImportRowRepo, MappedFieldRepo, OverrideAuditRepo,
    StageStatusRepo,
};
use tabula_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::ingest::parse_csv;
use crate::response::DataResponse;
use crate::state::AppState;

/// Leading bytes handed to the encoding check.
const ENCODING_SAMPLE_BYTES: usize = 4096;

/// Default and maximum page sizes for stage-data fetches.
const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

// ── Shared helpers ───────────────────────────────────────────────────

/// Load an import session or 404.
async fn load_file(pool: &DbPool, id: DbId) -> AppResult<ImportFile> {
    ImportFileRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportFile",
            id,
        }))
}

/// Decode the stored header list of a session.
fn headers_of(file: &ImportFile) -> AppResult<Vec<String>> {
    serde_json::from_value(file.headers.clone())
        .map_err(|e| AppError::InternalError(format!("corrupt header list: {e}")))
}

/// Decode one stored row's data object.
fn record_of(row: &ImportRow) -> AppResult<Record> {
    match &row.data {
        Value::Object(map) => Ok(map.clone()),
        other => Err(AppError::InternalError(format!(
            "row {} data is not an object: {other}",
            row.id
        ))),
    }
}

/// Rule-engine configuration with the server's upload limit applied.
fn base_check_config(state: &AppState) -> CheckConfig {
    CheckConfig {
        max_file_bytes: state.config.max_upload_bytes,
        ..CheckConfig::default()
    }
}

/// Persist a classified run as the stage's durable status.
async fn record_stage_report(
    pool: &DbPool,
    file_id: DbId,
    stage: Stage,
    status: StageStatus,
    report: &ClassifiedReport,
) -> AppResult<StageStatusRow> {
    let row = StageStatusRepo::upsert(
        pool,
        file_id,
        stage.as_str(),
        status.as_str(),
        report.critical_failures.len() as i32,
        report.warnings.len() as i32,
    )
    .await?;
    Ok(row)
}

// ── Upload File ──────────────────────────────────────────────────────

/// Typed response for the file upload endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Absent when the upload checks block and no session was created.
    pub file_id: Option<DbId>,
    pub stage_status: String,
    pub rows_loaded: usize,
    pub report: ClassifiedReport,
}

/// POST /api/v1/import/file
///
/// Accept a multipart file upload, run the upload-stage rule set, and
/// when nothing blocks, decode the rows and create the import session.
/// A blocked upload returns the full report and creates nothing.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadResult>>)> {
    let mut file_name: Option<String> = None;
    let mut bytes: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.file_name().is_none() {
            continue;
        }
        file_name = field.file_name().map(str::to_string);
        bytes = Some(
            field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        );
        break;
    }

    let file_name =
        file_name.ok_or_else(|| AppError::BadRequest("no file in multipart upload".into()))?;
    let bytes = bytes.ok_or_else(|| AppError::BadRequest("empty multipart upload".into()))?;

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let config = base_check_config(&state);
    let meta = FileMeta {
        file_name: file_name.clone(),
        byte_len: bytes.len() as u64,
        sample: bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)].to_vec(),
    };
    let results = run_stage_checks(Stage::FileUpload, &StageInput::File(meta), &config)?;
    let report = classify(results);

    if report.is_blocked() {
        return Ok((
            StatusCode::OK,
            Json(DataResponse {
                data: UploadResult {
                    file_id: None,
                    stage_status: report.stage_status().to_string(),
                    rows_loaded: 0,
                    report,
                },
            }),
        ));
    }

    // Binary spreadsheet formats are accepted by the upload checks but
    // only CSV content is decoded into rows here.
    let table = if extension == "csv" {
        parse_csv(&bytes)?
    } else {
        crate::ingest::ParsedTable {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    };

    let file = ImportFileRepo::create(
        &state.pool,
        &CreateImportFile {
            file_name,
            file_extension: extension,
            byte_size: bytes.len() as i64,
            headers: serde_json::json!(table.headers),
        },
    )
    .await?;

    let create_rows: Vec<CreateImportRow> = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| CreateImportRow {
            row_index: i as i32,
            data: Value::Object(row.record.clone()),
            annotations: annotations_to_wire(&row.annotations),
            row_status: row.status.as_str().to_string(),
            raw_column_count: row.raw_column_count as i32,
        })
        .collect();
    let inserted = ImportRowRepo::batch_insert(&state.pool, file.id, &create_rows).await?;

    let status = report.stage_status();
    record_stage_report(&state.pool, file.id, Stage::FileUpload, status, &report).await?;

    tracing::info!(
        file_id = file.id,
        rows = inserted.len(),
        status = %status,
        "Import session created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResult {
                file_id: Some(file.id),
                stage_status: status.to_string(),
                rows_loaded: inserted.len(),
                report,
            },
        }),
    ))
}

// ── Session Summary ──────────────────────────────────────────────────

/// Typed response for the session summary endpoint.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub file: ImportFile,
    pub stages: Vec<StageStatusRow>,
    pub total_rows: i64,
}

/// GET /api/v1/import/{id}
///
/// Return the session record, every recorded stage status, and the row
/// count. Stages with no recorded status are Not Started by convention.
pub async fn get_import_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SessionSummary>>> {
    let file = load_file(&state.pool, id).await?;
    let stages = StageStatusRepo::list_by_file(&state.pool, id).await?;
    let total_rows = ImportRowRepo::count(&state.pool, id, None).await?;

    Ok(Json(DataResponse {
        data: SessionSummary {
            file,
            stages,
            total_rows,
        },
    }))
}

// ── Stage Data ───────────────────────────────────────────────────────

/// Request body for the paginated stage-data endpoint. Every member is
/// optional; an empty body fetches the first page unfiltered.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageDataRequest {
    /// Zero-based index of the first row to return.
    pub start_index: u64,
    pub page_size: Option<u64>,
    /// Strip the `_id` handle and the `StatusMessage` member from the
    /// returned rows.
    pub exclude_system_columns: bool,
    /// Row-status filter: `All`, `Success`, `Warning`, or `Error`.
    /// `All` and absent both mean no filter.
    pub filter: Option<String>,
    /// Advisory: the stored rows are shared across stages.
    pub stage: Option<String>,
}

/// Legacy inner payload: `result` and `mappedFields` are JSON-encoded
/// strings, not nested JSON, because downstream consumers double-decode
/// them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDataBody {
    pub result: String,
    pub count: i64,
    pub mapped_fields: String,
    pub error_message: Option<String>,
}

/// Mapping entry in the legacy camelCase wire shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMapping {
    pub source_column: String,
    pub target_field: String,
    pub required: bool,
}

/// Legacy stage-data envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDataResponse {
    pub status: String,
    pub data: StageDataBody,
    /// 1-based "showing X to Y" range; absent for an empty page.
    pub display_range: Option<DisplayRange>,
}

/// POST /api/v1/import/{id}/stage-data
///
/// Fetch one page of rows in the legacy envelope. Rows carry their
/// annotations re-attached as a `StatusMessage` member.
pub async fn stage_data(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<StageDataRequest>,
) -> AppResult<Json<StageDataResponse>> {
    load_file(&state.pool, id).await?;

    let page_size = request
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let row_status_filter = request
        .filter
        .as_deref()
        .filter(|f| !f.eq_ignore_ascii_case("all"));

    let total = ImportRowRepo::count(&state.pool, id, row_status_filter).await?;
    let rows = ImportRowRepo::fetch_page(
        &state.pool,
        id,
        row_status_filter,
        request.start_index as i64,
        page_size as i64,
    )
    .await?;

    let wire_rows: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut record = record_of(row)?;
            if !request.exclude_system_columns {
                // Row handle for the correction endpoint; underscored so
                // it cannot collide with a data column.
                record.insert("_id".to_string(), serde_json::json!(row.id));
                let has_annotations = row
                    .annotations
                    .as_array()
                    .is_some_and(|entries| !entries.is_empty());
                if has_annotations {
                    record.insert("StatusMessage".to_string(), row.annotations.clone());
                }
            }
            Ok(Value::Object(record))
        })
        .collect::<AppResult<_>>()?;

    let result = serde_json::to_string(&wire_rows)
        .map_err(|e| AppError::InternalError(format!("failed to encode rows: {e}")))?;

    let mappings: Vec<WireMapping> = MappedFieldRepo::list_by_file(&state.pool, id)
        .await?
        .into_iter()
        .map(|m| WireMapping {
            source_column: m.source_column,
            target_field: m.target_field,
            required: m.required,
        })
        .collect();
    let mapped_fields = serde_json::to_string(&mappings)
        .map_err(|e| AppError::InternalError(format!("failed to encode mappings: {e}")))?;

    Ok(Json(StageDataResponse {
        status: "Success".to_string(),
        data: StageDataBody {
            result,
            count: total,
            mapped_fields,
            error_message: None,
        },
        display_range: display_range_at(total as u64, request.start_index, wire_rows.len() as u64),
    }))
}

// ── Commit Mapping ───────────────────────────────────────────────────

/// Request body for committing a column mapping.
#[derive(Debug, Deserialize)]
pub struct MappingRequest {
    pub mappings: Vec<ColumnMapping>,
    pub target_fields: Vec<TargetField>,
}

/// Typed response for a rule-engine run against a stage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRunResult {
    pub stage: String,
    pub stage_status: String,
    /// Whether the side effect of the run (mapping commit) was applied.
    pub committed: bool,
    pub report: ClassifiedReport,
}

/// POST /api/v1/import/{id}/mapping
///
/// Run the mapping rule set against the proposed assignment. The mapping
/// is committed only when nothing blocks; advisory results commit but
/// surface in the report.
pub async fn commit_mapping(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<MappingRequest>,
) -> AppResult<Json<DataResponse<CheckRunResult>>> {
    let file = load_file(&state.pool, id).await?;
    let source_columns = headers_of(&file)?;

    let input = MappingInput {
        mappings: request.mappings.clone(),
        target_fields: request.target_fields.clone(),
        source_columns,
    };
    let results = run_stage_checks(
        Stage::FieldMapping,
        &StageInput::Mapping(input),
        &base_check_config(&state),
    )?;
    let report = classify(results);
    let status = report.stage_status();

    let committed = !report.is_blocked();
    if committed {
        let create: Vec<CreateMappedField> = request
            .mappings
            .iter()
            .map(|m| CreateMappedField {
                source_column: m.source_column.clone(),
                target_field: m.target_field.clone(),
                required: request
                    .target_fields
                    .iter()
                    .any(|t| t.required && t.name == m.target_field),
            })
            .collect();
        MappedFieldRepo::replace_for_file(&state.pool, id, &create).await?;
    }

    record_stage_report(&state.pool, id, Stage::FieldMapping, status, &report).await?;

    Ok(Json(DataResponse {
        data: CheckRunResult {
            stage: Stage::FieldMapping.to_string(),
            stage_status: status.to_string(),
            committed,
            report,
        },
    }))
}

// ── Run Checks ───────────────────────────────────────────────────────

/// Request body for a data-stage rule-engine run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksRequest {
    pub stage: String,
    /// Optional rule configuration; the server default applies otherwise.
    pub config: Option<CheckConfig>,
}

/// POST /api/v1/import/{id}/checks
///
/// Run the rule set for a row-based stage against the stored rows and
/// persist the resulting stage status. FileUpload and FieldMapping have
/// their own endpoints and are rejected here.
pub async fn run_checks(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<ChecksRequest>,
) -> AppResult<Json<DataResponse<CheckRunResult>>> {
    let stage: Stage = request.stage.parse().map_err(AppError::Core)?;
    if matches!(stage, Stage::FileUpload | Stage::FieldMapping) {
        return Err(AppError::BadRequest(format!(
            "{stage} checks run through the upload and mapping endpoints"
        )));
    }

    let file = load_file(&state.pool, id).await?;
    let rows = ImportRowRepo::list_by_file(&state.pool, id).await?;

    let mut records = Vec::with_capacity(rows.len());
    let mut raw_column_counts = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(record_of(row)?);
        raw_column_counts.push(row.raw_column_count as usize);
    }
    let input = RowsInput {
        headers: headers_of(&file)?,
        records,
        raw_column_counts,
    };

    let config = request.config.unwrap_or_else(|| base_check_config(&state));
    let results = run_stage_checks(stage, &StageInput::Rows(input), &config)?;
    let report = classify(results);

    // Verification findings wait for an explicit user decision rather
    // than reading as a plain warning.
    let status = if stage == Stage::DataVerification
        && !report.is_blocked()
        && !report.warnings.is_empty()
    {
        StageStatus::VerificationPending
    } else {
        report.stage_status()
    };

    record_stage_report(&state.pool, id, stage, status, &report).await?;

    Ok(Json(DataResponse {
        data: CheckRunResult {
            stage: stage.to_string(),
            stage_status: status.to_string(),
            committed: true,
            report,
        },
    }))
}

// ── Apply Correction ─────────────────────────────────────────────────

/// Request body for a cell correction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub row_id: DbId,
    pub field_name: String,
    pub new_value: String,
    /// Rewrite every row of the session holding the same original value.
    pub propagate: bool,
    /// Which check surfaced the problem (recorded in the log).
    pub validation_type: String,
}

/// Typed response for a correction commit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionOutcome {
    pub applied_rows: usize,
    pub row_ids: Vec<DbId>,
    /// Rows whose corrected value still violates a rule for the column.
    pub still_invalid: Vec<DbId>,
    pub log_id: DbId,
}

/// POST /api/v1/import/{id}/correction
///
/// Overwrite one cell, optionally propagating to every row carrying the
/// same original value. The new value is re-checked against the column's
/// rules before the annotations change: a value that still violates a
/// rule keeps a replacement annotation and the row never flips to
/// Success silently. The commit is appended to the correction log.
pub async fn apply_correction(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<CorrectionRequest>,
) -> AppResult<Json<DataResponse<CorrectionOutcome>>> {
    load_file(&state.pool, id).await?;

    let row = ImportRowRepo::find_by_id(&state.pool, request.row_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportRow",
            id: request.row_id,
        }))?;
    if row.file_id != id {
        return Err(AppError::BadRequest(format!(
            "row {} does not belong to import {id}",
            row.id
        )));
    }

    let record = record_of(&row)?;
    if !record.contains_key(&request.field_name) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "unknown column '{}'",
            request.field_name
        ))));
    }
    let old_value = cell_str(&record, &request.field_name).unwrap_or_default();

    // An unchanged value never fans out, whatever the propagation choice.
    let touched: Vec<ImportRow> = if request.propagate && old_value != request.new_value {
        ImportRowRepo::propagate_value(
            &state.pool,
            id,
            &request.field_name,
            &old_value,
            &request.new_value,
        )
        .await?
    } else {
        ImportRowRepo::update_cell(&state.pool, row.id, &request.field_name, &request.new_value)
            .await?
            .into_iter()
            .collect()
    };

    // Re-check the corrected value before touching the annotations. A
    // still-violating value gets a replacement annotation so the row
    // never reads as Success with a bad cell in it.
    let rechecks = quality::recheck_cell(
        &request.field_name,
        &request.new_value,
        &base_check_config(&state),
    );
    let replacement = rechecks
        .iter()
        .find(|c| c.status == CheckStatus::Fail)
        .or_else(|| rechecks.first())
        .map(|check| CellAnnotation {
            column: request.field_name.clone(),
            kind: if check.status == CheckStatus::Fail {
                AnnotationKind::Error
            } else {
                AnnotationKind::Warning
            },
            message: check.message.clone(),
            raw_value: Some(request.new_value.clone()),
        });

    for touched_row in &touched {
        let mut annotations = parse_status_message(&touched_row.annotations)?;
        let before = annotations.len();
        annotations.retain(|a| a.column != request.field_name);
        let cleared = annotations.len() != before;
        if let Some(annotation) = &replacement {
            annotations.push(annotation.clone());
        }
        if cleared || replacement.is_some() {
            ImportRowRepo::update_annotations(
                &state.pool,
                touched_row.id,
                &annotations_to_wire(&annotations),
                row_status(&annotations).as_str(),
            )
            .await?;
        }
    }

    let still_invalid: Vec<DbId> = if replacement.is_some() {
        touched.iter().map(|r| r.id).collect()
    } else {
        Vec::new()
    };

    let log = CorrectionLogRepo::create(
        &state.pool,
        &CreateCorrectionLog {
            file_id: id,
            row_id: row.id,
            column_name: request.field_name.clone(),
            old_value,
            new_value: request.new_value.clone(),
            is_batch_update: touched.len() > 1,
            validation_type: request.validation_type.clone(),
            affected_count: touched.len() as i32,
        },
    )
    .await?;

    tracing::info!(
        file_id = id,
        column = %request.field_name,
        affected = touched.len(),
        "Correction applied"
    );

    Ok(Json(DataResponse {
        data: CorrectionOutcome {
            applied_rows: touched.len(),
            row_ids: touched.iter().map(|r| r.id).collect(),
            still_invalid,
            log_id: log.id,
        },
    }))
}

// ── Advance Stage ────────────────────────────────────────────────────

/// Request body for gated stage advancement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub stage: String,
    /// Required when advisory issues are outstanding; recorded in the
    /// override audit trail.
    pub override_reason: Option<String>,
}

/// Typed response for a stage advancement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResult {
    pub from: String,
    pub to: String,
    pub overridden: bool,
}

/// POST /api/v1/import/{id}/advance
///
/// Advance past a stage. Critical failures always refuse; outstanding
/// warnings refuse unless an override reason is supplied, in which case
/// the decision is persisted to the audit trail.
pub async fn advance_stage(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<AdvanceRequest>,
) -> AppResult<Json<DataResponse<AdvanceResult>>> {
    load_file(&state.pool, id).await?;
    let stage: Stage = request.stage.parse().map_err(AppError::Core)?;

    let next = stage.next().ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "{stage} is the final stage; nothing to advance to"
        )))
    })?;

    // Stages that never ran have nothing blocking them.
    let recorded = StageStatusRepo::find(&state.pool, id, stage.as_str()).await?;
    let (critical_count, warning_count) = recorded
        .map(|s| (s.critical_count, s.warning_count))
        .unwrap_or((0, 0));

    if critical_count > 0 {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "{stage} has {critical_count} critical failure(s); fix them before advancing"
        ))));
    }

    let overridden = if warning_count > 0 {
        let reason = request.override_reason.as_deref().ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "{stage} has {warning_count} advisory issue(s); advancing requires an explicit override"
            )))
        })?;
        OverrideAuditRepo::create(
            &state.pool,
            &CreateOverrideAudit {
                file_id: id,
                stage: stage.to_string(),
                warnings_outstanding: warning_count,
                reason: reason.to_string(),
            },
        )
        .await?;
        tracing::info!(file_id = id, stage = %stage, warning_count, "Stage advanced via override");
        true
    } else {
        false
    };

    StageStatusRepo::upsert(
        &state.pool,
        id,
        next.as_str(),
        StageStatus::InProgress.as_str(),
        0,
        0,
    )
    .await?;

    Ok(Json(DataResponse {
        data: AdvanceResult {
            from: stage.to_string(),
            to: next.to_string(),
            overridden,
        },
    }))
}

// ── Cancel ───────────────────────────────────────────────────────────

/// Typed response for session cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResult {
    pub cancelled: bool,
}

/// POST /api/v1/import/{id}/cancel
///
/// Tear the session down: rows, mappings, statuses, and logs go with it.
pub async fn cancel_import(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CancelResult>>> {
    let deleted = ImportFileRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ImportFile",
            id,
        }));
    }

    tracing::info!(file_id = id, "Import session cancelled");

    Ok(Json(DataResponse {
        data: CancelResult { cancelled: true },
    }))
}
