//! The staged rule engine: typed check results and per-stage dispatch.
//!
//! Each stage has a fixed, ordered set of independent checks. Checks
//! never short-circuit each other; every check runs against the same
//! input snapshot, and re-running the engine on the same input yields
//! the same results. Data-shape problems are encoded as results, never
//! panics.

pub mod file;
pub mod mapping;
pub mod quality;
pub mod structure;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::record::Record;
use crate::stage::Stage;

// ── Result types ─────────────────────────────────────────────────────

/// Outcome of one check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pending,
    Pass,
    Warning,
    Fail,
}

/// How severe a failing check is. Only `Fail` + `Critical` blocks
/// stage progression; every other combination is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Warning,
}

/// A row flagged by a check, with enough context to open a correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedRow {
    pub row_index: usize,
    pub value: String,
    pub row_data: Record,
}

/// The result of running one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Stable machine identifier (e.g. "file-size").
    pub id: String,
    /// Human-readable check name.
    pub name: String,
    pub status: CheckStatus,
    pub severity: Severity,
    pub message: String,
    pub technical_details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_rows: Vec<AffectedRow>,
}

impl CheckResult {
    /// True iff this result blocks stage progression.
    pub fn is_blocking(&self) -> bool {
        self.status == CheckStatus::Fail && self.severity == Severity::Critical
    }

    pub(crate) fn pass(id: &str, name: &str, severity: Severity, message: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: CheckStatus::Pass,
            severity,
            message: message.to_string(),
            technical_details: String::new(),
            affected_rows: Vec::new(),
        }
    }

    pub(crate) fn with_details(mut self, details: String) -> Self {
        self.technical_details = details;
        self
    }

    pub(crate) fn failing(
        id: &str,
        name: &str,
        status: CheckStatus,
        severity: Severity,
        message: String,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status,
            severity,
            message,
            technical_details: String::new(),
            affected_rows: Vec::new(),
        }
    }

    pub(crate) fn with_rows(mut self, rows: Vec<AffectedRow>) -> Self {
        self.affected_rows = rows;
        self
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// A per-field character limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharLimit {
    pub field: String,
    pub max_chars: usize,
}

/// A start/end date pair validated for chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatePair {
    pub start_field: String,
    pub end_field: String,
}

/// Static configuration consumed by the rule engine.
///
/// Field lists are matched case-insensitively against headers where the
/// individual checks say so. Partial configurations deserialize against
/// the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Maximum accepted upload size in bytes.
    pub max_file_bytes: u64,
    /// Accepted file extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Columns that must be present in the header row.
    pub required_columns: Vec<String>,
    /// Fields validated against the email format.
    pub email_fields: Vec<String>,
    /// Fields that must hold numeric values.
    pub numeric_fields: Vec<String>,
    /// Fields forming the composite duplicate-detection key. When
    /// empty, all columns participate.
    pub key_fields: Vec<String>,
    /// Per-field character limits.
    pub char_limits: Vec<CharLimit>,
    /// Date pairs checked for `end >= start`.
    pub date_pairs: Vec<DatePair>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["csv".into(), "xls".into(), "xlsx".into()],
            required_columns: Vec::new(),
            email_fields: vec!["email".into()],
            numeric_fields: Vec::new(),
            key_fields: Vec::new(),
            char_limits: Vec::new(),
            date_pairs: vec![DatePair {
                start_field: "start_date".into(),
                end_field: "end_date".into(),
            }],
        }
    }
}

// ── Stage inputs and dispatch ────────────────────────────────────────

/// Metadata and a decode sample for an uploaded file.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub file_name: String,
    pub byte_len: u64,
    /// Leading bytes of the file used for the encoding round-trip.
    pub sample: Vec<u8>,
}

/// One committed source-column to target-field assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: String,
}

/// A field of the destination schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetField {
    pub name: String,
    pub required: bool,
}

/// Input for the column-mapping checks.
#[derive(Debug, Clone)]
pub struct MappingInput {
    pub mappings: Vec<ColumnMapping>,
    pub target_fields: Vec<TargetField>,
    pub source_columns: Vec<String>,
}

/// Input for structure and data-quality checks.
#[derive(Debug, Clone)]
pub struct RowsInput {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// Raw per-row column counts as observed by the parser, used by the
    /// row-length consistency check (records are padded and cannot show
    /// raggedness themselves).
    pub raw_column_counts: Vec<usize>,
}

/// The data snapshot a stage's rule set runs against.
#[derive(Debug, Clone)]
pub enum StageInput {
    File(FileMeta),
    Mapping(MappingInput),
    Rows(RowsInput),
}

/// Run the fixed rule set for `stage` against `input`.
///
/// FinalReview and ImportPush carry no rule set of their own; they gate
/// purely on the stage status tracker and yield an empty result list.
/// Passing the wrong input variant for a stage is a caller bug and is
/// reported as a `Validation` error rather than a check result.
pub fn run_stage_checks(
    stage: Stage,
    input: &StageInput,
    config: &CheckConfig,
) -> Result<Vec<CheckResult>, CoreError> {
    match (stage, input) {
        (Stage::FileUpload, StageInput::File(meta)) => Ok(file::run_file_checks(meta, config)),
        (Stage::FieldMapping, StageInput::Mapping(mapping)) => {
            Ok(mapping::run_mapping_checks(mapping))
        }
        (Stage::DataPreflight, StageInput::Rows(rows)) => {
            Ok(structure::run_structure_checks(rows, config))
        }
        (Stage::DataValidation | Stage::DataVerification, StageInput::Rows(rows)) => {
            Ok(quality::run_quality_checks(rows, config))
        }
        (Stage::FinalReview | Stage::ImportPush, _) => Ok(Vec::new()),
        (stage, _) => Err(CoreError::Validation(format!(
            "input snapshot does not match stage {stage}"
        ))),
    }
}

/// Case-insensitive membership test used by several checks.
pub(crate) fn contains_ci(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|h| h.eq_ignore_ascii_case(needle))
}

/// Extract a trimmed string view of a cell for validation purposes.
pub(crate) fn cell_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn dispatch_rejects_mismatched_input() {
        let config = CheckConfig::default();
        let input = StageInput::File(FileMeta {
            file_name: "a.csv".into(),
            byte_len: 1,
            sample: vec![],
        });
        assert_matches!(
            run_stage_checks(Stage::DataValidation, &input, &config),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn final_stages_have_no_rule_set() {
        let config = CheckConfig::default();
        let input = StageInput::Rows(RowsInput {
            headers: vec![],
            records: vec![],
            raw_column_counts: vec![],
        });
        assert!(run_stage_checks(Stage::FinalReview, &input, &config)
            .unwrap()
            .is_empty());
        assert!(run_stage_checks(Stage::ImportPush, &input, &config)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn engine_is_idempotent() {
        let config = CheckConfig {
            numeric_fields: vec!["age".into()],
            ..CheckConfig::default()
        };
        let mut record = Record::new();
        record.insert("age".into(), serde_json::json!("abc"));
        let input = StageInput::Rows(RowsInput {
            headers: vec!["age".into()],
            records: vec![record],
            raw_column_counts: vec![1],
        });

        let first = run_stage_checks(Stage::DataValidation, &input, &config).unwrap();
        let second = run_stage_checks(Stage::DataValidation, &input, &config).unwrap();
        assert_eq!(first, second);
    }
}
