//! Data-quality checks over the Record set.

use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use super::{cell_text, AffectedRow, CheckConfig, CheckResult, CheckStatus, RowsInput, Severity};
use crate::record::Record;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Run the data-quality rule set in its fixed order.
pub fn run_quality_checks(rows: &RowsInput, config: &CheckConfig) -> Vec<CheckResult> {
    vec![
        check_email_format(rows, config),
        check_numeric_fields(rows, config),
        check_date_order(rows, config),
        check_duplicate_rows(rows, config),
        check_char_limits(rows, config),
    ]
}

/// Re-run the single-cell rules for one field holding a corrected value.
///
/// The configuration is narrowed to the given field, so only the rules
/// that mention it participate; cross-row rules (duplicates) and
/// cross-field rules (date order) do not apply to a lone cell. Returns
/// the non-passing results.
pub fn recheck_cell(field: &str, value: &str, config: &CheckConfig) -> Vec<CheckResult> {
    let narrowed = CheckConfig {
        email_fields: config
            .email_fields
            .iter()
            .filter(|f| f.as_str() == field)
            .cloned()
            .collect(),
        numeric_fields: config
            .numeric_fields
            .iter()
            .filter(|f| f.as_str() == field)
            .cloned()
            .collect(),
        char_limits: config
            .char_limits
            .iter()
            .filter(|l| l.field == field)
            .cloned()
            .collect(),
        date_pairs: Vec::new(),
        key_fields: Vec::new(),
        ..config.clone()
    };

    let mut record = Record::new();
    record.insert(field.to_string(), Value::String(value.to_string()));
    let rows = RowsInput {
        headers: vec![field.to_string()],
        records: vec![record],
        raw_column_counts: vec![1],
    };

    run_quality_checks(&rows, &narrowed)
        .into_iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .collect()
}

fn check_email_format(rows: &RowsInput, config: &CheckConfig) -> CheckResult {
    let pattern = Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex");
    let mut affected = Vec::new();

    for (row_index, record) in rows.records.iter().enumerate() {
        for field in &config.email_fields {
            if let Some(value) = cell_text(record, field) {
                if !value.is_empty() && !pattern.is_match(&value) {
                    affected.push(AffectedRow {
                        row_index,
                        value,
                        row_data: record.clone(),
                    });
                }
            }
        }
    }

    if affected.is_empty() {
        CheckResult::pass(
            "email-format",
            "Email format",
            Severity::Warning,
            "All email values match the expected format",
        )
    } else {
        let count = affected.len();
        CheckResult::failing(
            "email-format",
            "Email format",
            CheckStatus::Warning,
            Severity::Warning,
            format!("{count} row(s) have malformed email addresses"),
        )
        .with_rows(affected)
    }
}

fn check_numeric_fields(rows: &RowsInput, config: &CheckConfig) -> CheckResult {
    let mut affected = Vec::new();

    for (row_index, record) in rows.records.iter().enumerate() {
        for field in &config.numeric_fields {
            if let Some(value) = cell_text(record, field) {
                // Mirrors `isNaN(Number(x))`: the empty string coerces
                // to zero and therefore passes.
                if !value.is_empty() && value.parse::<f64>().is_err() {
                    affected.push(AffectedRow {
                        row_index,
                        value,
                        row_data: record.clone(),
                    });
                }
            }
        }
    }

    if affected.is_empty() {
        CheckResult::pass(
            "numeric-values",
            "Numeric values",
            Severity::High,
            "All configured numeric fields hold numeric values",
        )
    } else {
        let count = affected.len();
        CheckResult::failing(
            "numeric-values",
            "Numeric values",
            CheckStatus::Fail,
            Severity::High,
            format!("{count} row(s) have non-numeric values in numeric fields"),
        )
        .with_rows(affected)
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .ok()
}

fn check_date_order(rows: &RowsInput, config: &CheckConfig) -> CheckResult {
    let mut affected = Vec::new();

    for (row_index, record) in rows.records.iter().enumerate() {
        for pair in &config.date_pairs {
            let start = cell_text(record, &pair.start_field).and_then(|t| parse_date(&t));
            let end = cell_text(record, &pair.end_field).and_then(|t| parse_date(&t));
            // Only rows where both sides parse as dates participate.
            if let (Some(start), Some(end)) = (start, end) {
                if end < start {
                    affected.push(AffectedRow {
                        row_index,
                        value: format!("{start} > {end}"),
                        row_data: record.clone(),
                    });
                }
            }
        }
    }

    if affected.is_empty() {
        CheckResult::pass(
            "date-order",
            "Date order",
            Severity::High,
            "All date ranges are chronologically ordered",
        )
    } else {
        let count = affected.len();
        CheckResult::failing(
            "date-order",
            "Date order",
            CheckStatus::Fail,
            Severity::High,
            format!("{count} row(s) have an end date before the start date"),
        )
        .with_rows(affected)
    }
}

fn check_duplicate_rows(rows: &RowsInput, config: &CheckConfig) -> CheckResult {
    // Composite key over the configured fields, falling back to every
    // column when none are configured.
    let key_fields: Vec<String> = if config.key_fields.is_empty() {
        rows.headers.clone()
    } else {
        config.key_fields.clone()
    };

    let mut key_to_rows: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_index, record) in rows.records.iter().enumerate() {
        let key = key_fields
            .iter()
            .map(|f| cell_text(record, f).unwrap_or_default().to_lowercase())
            .collect::<Vec<_>>()
            .join("|");
        key_to_rows.entry(key).or_default().push(row_index);
    }

    let mut affected = Vec::new();
    let mut duplicate_groups: Vec<(String, Vec<usize>)> = key_to_rows
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .collect();
    duplicate_groups.sort_by(|a, b| a.1[0].cmp(&b.1[0]));

    for (key, indices) in &duplicate_groups {
        for &row_index in indices {
            affected.push(AffectedRow {
                row_index,
                value: key.clone(),
                row_data: rows.records[row_index].clone(),
            });
        }
    }

    if affected.is_empty() {
        CheckResult::pass(
            "duplicate-rows",
            "Duplicate rows",
            Severity::Medium,
            "No duplicate rows detected",
        )
    } else {
        CheckResult::failing(
            "duplicate-rows",
            "Duplicate rows",
            CheckStatus::Warning,
            Severity::Medium,
            format!(
                "{} duplicate group(s) spanning {} row(s)",
                duplicate_groups.len(),
                affected.len()
            ),
        )
        .with_rows(affected)
    }
}

fn check_char_limits(rows: &RowsInput, config: &CheckConfig) -> CheckResult {
    let mut affected = Vec::new();

    for (row_index, record) in rows.records.iter().enumerate() {
        for limit in &config.char_limits {
            if let Some(value) = cell_text(record, &limit.field) {
                if value.chars().count() > limit.max_chars {
                    affected.push(AffectedRow {
                        row_index,
                        value,
                        row_data: record.clone(),
                    });
                }
            }
        }
    }

    if affected.is_empty() {
        CheckResult::pass(
            "char-limit",
            "Character limits",
            Severity::High,
            "All fields are within their character limits",
        )
    } else {
        let count = affected.len();
        CheckResult::failing(
            "char-limit",
            "Character limits",
            CheckStatus::Fail,
            Severity::High,
            format!("{count} row(s) exceed a configured character limit"),
        )
        .with_rows(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use serde_json::json;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    fn rows_input(headers: &[&str], records: Vec<Record>) -> RowsInput {
        let counts = vec![headers.len(); records.len()];
        RowsInput {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            records,
            raw_column_counts: counts,
        }
    }

    fn result_by_id<'a>(results: &'a [CheckResult], id: &str) -> &'a CheckResult {
        results.iter().find(|r| r.id == id).expect("check present")
    }

    // -- email --

    #[test]
    fn malformed_email_warns_with_affected_rows() {
        let rows = rows_input(
            &["email"],
            vec![record(&[("email", "good@example.com")]), record(&[("email", "bad@@")])],
        );
        let results = run_quality_checks(&rows, &CheckConfig::default());
        let email = result_by_id(&results, "email-format");
        assert_eq!(email.status, CheckStatus::Warning);
        assert_eq!(email.affected_rows.len(), 1);
        assert_eq!(email.affected_rows[0].row_index, 1);
        assert_eq!(email.affected_rows[0].value, "bad@@");
    }

    #[test]
    fn all_valid_emails_pass() {
        let rows = rows_input(&["email"], vec![record(&[("email", "a@b.co")])]);
        let results = run_quality_checks(&rows, &CheckConfig::default());
        assert_eq!(result_by_id(&results, "email-format").status, CheckStatus::Pass);
    }

    #[test]
    fn empty_email_cell_is_not_flagged() {
        let rows = rows_input(&["email"], vec![record(&[("email", "")])]);
        let results = run_quality_checks(&rows, &CheckConfig::default());
        assert_eq!(result_by_id(&results, "email-format").status, CheckStatus::Pass);
    }

    // -- numeric --

    #[test]
    fn non_numeric_value_fails_high() {
        let config = CheckConfig {
            numeric_fields: vec!["age".into()],
            ..CheckConfig::default()
        };
        let rows = rows_input(&["age"], vec![record(&[("age", "abc")])]);
        let results = run_quality_checks(&rows, &config);
        let numeric = result_by_id(&results, "numeric-values");
        assert_eq!(numeric.status, CheckStatus::Fail);
        assert_eq!(numeric.severity, Severity::High);
        assert_eq!(numeric.affected_rows.len(), 1);
        assert_eq!(numeric.affected_rows[0].row_index, 0);
    }

    #[test]
    fn numeric_strings_and_numbers_pass() {
        let config = CheckConfig {
            numeric_fields: vec!["age".into()],
            ..CheckConfig::default()
        };
        let mut with_number = Record::new();
        with_number.insert("age".into(), json!(41));
        let rows = rows_input(&["age"], vec![record(&[("age", "12.5")]), with_number]);
        let results = run_quality_checks(&rows, &config);
        assert_eq!(result_by_id(&results, "numeric-values").status, CheckStatus::Pass);
    }

    #[test]
    fn empty_numeric_cell_passes_like_js_coercion() {
        let config = CheckConfig {
            numeric_fields: vec!["age".into()],
            ..CheckConfig::default()
        };
        let rows = rows_input(&["age"], vec![record(&[("age", "")])]);
        let results = run_quality_checks(&rows, &config);
        assert_eq!(result_by_id(&results, "numeric-values").status, CheckStatus::Pass);
    }

    // -- date order --

    #[test]
    fn end_before_start_fails_high() {
        let rows = rows_input(
            &["start_date", "end_date"],
            vec![record(&[("start_date", "2024-05-01"), ("end_date", "2024-04-01")])],
        );
        let results = run_quality_checks(&rows, &CheckConfig::default());
        let dates = result_by_id(&results, "date-order");
        assert_eq!(dates.status, CheckStatus::Fail);
        assert_eq!(dates.severity, Severity::High);
        assert_eq!(dates.affected_rows[0].row_index, 0);
    }

    #[test]
    fn unparsable_dates_are_skipped() {
        let rows = rows_input(
            &["start_date", "end_date"],
            vec![record(&[("start_date", "soon"), ("end_date", "2024-04-01")])],
        );
        let results = run_quality_checks(&rows, &CheckConfig::default());
        assert_eq!(result_by_id(&results, "date-order").status, CheckStatus::Pass);
    }

    #[test]
    fn equal_dates_are_ordered() {
        let rows = rows_input(
            &["start_date", "end_date"],
            vec![record(&[("start_date", "2024-05-01"), ("end_date", "2024-05-01")])],
        );
        let results = run_quality_checks(&rows, &CheckConfig::default());
        assert_eq!(result_by_id(&results, "date-order").status, CheckStatus::Pass);
    }

    #[test]
    fn slash_format_dates_parse() {
        let rows = rows_input(
            &["start_date", "end_date"],
            vec![record(&[("start_date", "05/02/2024"), ("end_date", "04/01/2024")])],
        );
        let results = run_quality_checks(&rows, &CheckConfig::default());
        assert_eq!(result_by_id(&results, "date-order").status, CheckStatus::Fail);
    }

    // -- duplicates --

    #[test]
    fn duplicate_keys_warn_medium_case_insensitively() {
        let config = CheckConfig {
            key_fields: vec!["name".into(), "city".into()],
            ..CheckConfig::default()
        };
        let rows = rows_input(
            &["name", "city"],
            vec![
                record(&[("name", "Ada"), ("city", "London")]),
                record(&[("name", "ADA"), ("city", "london")]),
                record(&[("name", "Grace"), ("city", "DC")]),
            ],
        );
        let results = run_quality_checks(&rows, &config);
        let dup = result_by_id(&results, "duplicate-rows");
        assert_eq!(dup.status, CheckStatus::Warning);
        assert_eq!(dup.severity, Severity::Medium);
        let indices: Vec<usize> = dup.affected_rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn unique_rows_pass() {
        let rows = rows_input(
            &["name"],
            vec![record(&[("name", "Ada")]), record(&[("name", "Grace")])],
        );
        let results = run_quality_checks(&rows, &CheckConfig::default());
        assert_eq!(result_by_id(&results, "duplicate-rows").status, CheckStatus::Pass);
    }

    // -- char limits --

    #[test]
    fn over_limit_value_fails_high() {
        let config = CheckConfig {
            char_limits: vec![super::super::CharLimit {
                field: "code".into(),
                max_chars: 3,
            }],
            ..CheckConfig::default()
        };
        let rows = rows_input(&["code"], vec![record(&[("code", "ABCD")])]);
        let results = run_quality_checks(&rows, &config);
        let limit = result_by_id(&results, "char-limit");
        assert_eq!(limit.status, CheckStatus::Fail);
        assert_eq!(limit.severity, Severity::High);
        assert_eq!(limit.affected_rows[0].value, "ABCD");
    }

    #[test]
    fn value_at_limit_passes() {
        let config = CheckConfig {
            char_limits: vec![super::super::CharLimit {
                field: "code".into(),
                max_chars: 4,
            }],
            ..CheckConfig::default()
        };
        let rows = rows_input(&["code"], vec![record(&[("code", "ABCD")])]);
        let results = run_quality_checks(&rows, &config);
        assert_eq!(result_by_id(&results, "char-limit").status, CheckStatus::Pass);
    }

    // -- cell recheck --

    #[test]
    fn recheck_flags_a_still_bad_email() {
        let results = recheck_cell("email", "still-not-an-email", &CheckConfig::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "email-format");
        assert_eq!(results[0].status, CheckStatus::Warning);
    }

    #[test]
    fn recheck_accepts_a_fixed_email() {
        assert!(recheck_cell("email", "ada@example.com", &CheckConfig::default()).is_empty());
    }

    #[test]
    fn recheck_only_consults_rules_for_the_field() {
        let config = CheckConfig {
            numeric_fields: vec!["age".into()],
            ..CheckConfig::default()
        };
        // "abc" is non-numeric, but the corrected field is not `age`.
        assert!(recheck_cell("notes", "abc", &config).is_empty());
        assert_eq!(recheck_cell("age", "abc", &config).len(), 1);
    }
}
