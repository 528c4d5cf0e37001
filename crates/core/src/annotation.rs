//! Per-cell annotations parsed once at the system boundary.
//!
//! Upstream row payloads carry a legacy `StatusMessage` field: an ordered
//! list of single-key objects, each mapping a column name to
//! `{ "Type": "Error"|"Warning", "Message": ..., "Value": ... }`. That
//! blob is parsed exactly once, here, into typed [`CellAnnotation`]s.
//! An unparsable blob is a data-integrity error and the owning row is
//! treated as an error row; the policy is the same on every path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Whether an annotation blocks the row or merely flags it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    Error,
    Warning,
}

/// One cell-level annotation attached to a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellAnnotation {
    /// Column the annotation applies to.
    pub column: String,
    pub kind: AnnotationKind,
    pub message: String,
    /// The offending raw value, when the producer recorded it.
    pub raw_value: Option<String>,
}

/// Row-level status derived from a row's annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Success,
    Warning,
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a legacy `StatusMessage` value into typed annotations.
///
/// Enforces the invariant that a column carries at most one annotation
/// per row; a second entry for the same column is a data-integrity
/// error, as is any entry that does not match the expected shape.
pub fn parse_status_message(raw: &Value) -> Result<Vec<CellAnnotation>, CoreError> {
    let entries = raw.as_array().ok_or_else(|| {
        CoreError::DataIntegrity("StatusMessage is not an array".to_string())
    })?;

    let mut annotations: Vec<CellAnnotation> = Vec::with_capacity(entries.len());

    for entry in entries {
        let obj = entry.as_object().ok_or_else(|| {
            CoreError::DataIntegrity("StatusMessage entry is not an object".to_string())
        })?;
        if obj.len() != 1 {
            return Err(CoreError::DataIntegrity(format!(
                "StatusMessage entry must have exactly one column key, got {}",
                obj.len()
            )));
        }
        let (column, body) = obj.iter().next().expect("len checked above");

        if annotations.iter().any(|a| &a.column == column) {
            return Err(CoreError::DataIntegrity(format!(
                "duplicate annotation for column '{column}'"
            )));
        }

        let kind = match body.get("Type").and_then(Value::as_str) {
            Some("Error") => AnnotationKind::Error,
            Some("Warning") => AnnotationKind::Warning,
            other => {
                return Err(CoreError::DataIntegrity(format!(
                    "annotation for column '{column}' has invalid Type {other:?}"
                )))
            }
        };
        let message = body
            .get("Message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let raw_value = body
            .get("Value")
            .and_then(Value::as_str)
            .map(str::to_string);

        annotations.push(CellAnnotation {
            column: column.clone(),
            kind,
            message,
            raw_value,
        });
    }

    Ok(annotations)
}

/// Serialize annotations back to the legacy wire shape.
pub fn annotations_to_wire(annotations: &[CellAnnotation]) -> Value {
    let entries: Vec<Value> = annotations
        .iter()
        .map(|a| {
            let mut body = serde_json::Map::new();
            body.insert(
                "Type".to_string(),
                Value::String(
                    match a.kind {
                        AnnotationKind::Error => "Error",
                        AnnotationKind::Warning => "Warning",
                    }
                    .to_string(),
                ),
            );
            body.insert("Message".to_string(), Value::String(a.message.clone()));
            if let Some(v) = &a.raw_value {
                body.insert("Value".to_string(), Value::String(v.clone()));
            }
            let mut entry = serde_json::Map::new();
            entry.insert(a.column.clone(), Value::Object(body));
            Value::Object(entry)
        })
        .collect();
    Value::Array(entries)
}

/// Derive the row-level status: Error beats Warning beats Success.
pub fn row_status(annotations: &[CellAnnotation]) -> RowStatus {
    if annotations.iter().any(|a| a.kind == AnnotationKind::Error) {
        RowStatus::Error
    } else if annotations.iter().any(|a| a.kind == AnnotationKind::Warning) {
        RowStatus::Warning
    } else {
        RowStatus::Success
    }
}
