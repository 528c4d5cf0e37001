//! The in-memory representation of one input row.

use serde_json::Value;

/// An ordered mapping from column name to scalar value for one row.
///
/// `serde_json` is built with `preserve_order`, so insertion order (the
/// original column order of the file) survives serialization round-trips.
pub type Record = serde_json::Map<String, Value>;

/// Read a cell as a string, rendering numbers with their JSON text form.
///
/// Returns `None` for missing cells and JSON nulls; empty strings are
/// returned as-is (an empty cell is still a present cell).
pub fn cell_str(record: &Record, column: &str) -> Option<String> {
    match record.get(column) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Build a [`Record`] from parallel header/value slices.
///
/// Extra values beyond the header count are dropped; missing trailing
/// values become empty strings, matching how ragged CSV rows surface to
/// the rule engine (the row-length check reports the raggedness itself).
pub fn record_from_row(headers: &[String], values: &[String]) -> Record {
    let mut record = Record::new();
    for (i, header) in headers.iter().enumerate() {
        let value = values.get(i).cloned().unwrap_or_default();
        record.insert(header.clone(), Value::String(value));
    }
    record
}
