//! CSV decoding at the upload boundary.
//!
//! Uploaded bytes are decoded exactly once, here, into padded records
//! plus the raw per-row cell counts the row-length check needs. A
//! legacy `StatusMessage` column, when present, is parsed into typed
//! cell annotations and stripped from the data columns; an unparsable
//! blob fails the whole upload as a data-integrity error.

use tabula_core::annotation::{parse_status_message, row_status, CellAnnotation, RowStatus};
use tabula_core::error::CoreError;
use tabula_core::record::{record_from_row, Record};

/// Header name of the legacy per-row annotation column.
const STATUS_MESSAGE_COLUMN: &str = "StatusMessage";

/// One decoded data row.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub record: Record,
    pub annotations: Vec<CellAnnotation>,
    pub status: RowStatus,
    /// Data-cell count as the parser saw it, before padding.
    pub raw_column_count: usize,
}

/// A decoded upload: data headers (annotation column stripped) and rows.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<ParsedRow>,
}

/// Decode CSV bytes into a [`ParsedTable`].
///
/// Ragged rows are accepted here; the preflight row-length check reports
/// them from the recorded raw counts. Short rows are padded with empty
/// strings so every record exposes the full header set.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedTable, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| CoreError::Validation(format!("unreadable CSV header row: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let status_index = raw_headers.iter().position(|h| h == STATUS_MESSAGE_COLUMN);
    let headers: Vec<String> = raw_headers
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != status_index)
        .map(|(_, h)| h.clone())
        .collect();

    let mut rows = Vec::new();
    for (row_index, result) in reader.records().enumerate() {
        let raw = result
            .map_err(|e| CoreError::Validation(format!("unreadable CSV row {row_index}: {e}")))?;

        let mut values: Vec<String> = Vec::with_capacity(raw.len());
        let mut status_blob: Option<String> = None;
        for (i, cell) in raw.iter().enumerate() {
            if Some(i) == status_index {
                status_blob = Some(cell.to_string());
            } else {
                values.push(cell.to_string());
            }
        }

        let annotations = match status_blob.as_deref() {
            None | Some("") => Vec::new(),
            Some(blob) => {
                let value: serde_json::Value = serde_json::from_str(blob).map_err(|e| {
                    CoreError::DataIntegrity(format!(
                        "row {row_index}: StatusMessage is not valid JSON: {e}"
                    ))
                })?;
                parse_status_message(&value)?
            }
        };

        let raw_column_count = values.len();
        let status = row_status(&annotations);
        rows.push(ParsedRow {
            record: record_from_row(&headers, &values),
            annotations,
            status,
            raw_column_count,
        });
    }

    Ok(ParsedTable { headers, rows })
}
