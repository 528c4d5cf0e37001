//! Structural checks over the parsed table: headers and row shape.

use std::collections::HashSet;

use super::{contains_ci, CheckConfig, CheckResult, CheckStatus, RowsInput, Severity};

/// Run the structure rule set in its fixed order.
pub fn run_structure_checks(rows: &RowsInput, config: &CheckConfig) -> Vec<CheckResult> {
    vec![
        check_header_uniqueness(&rows.headers),
        check_row_length_consistency(rows),
        check_required_columns(&rows.headers, config),
    ]
}

fn check_header_uniqueness(headers: &[String]) -> CheckResult {
    let distinct: HashSet<&String> = headers.iter().collect();
    if distinct.len() == headers.len() {
        CheckResult::pass(
            "header-uniqueness",
            "Header uniqueness",
            Severity::High,
            "All column headers are unique",
        )
    } else {
        let mut seen = HashSet::new();
        let duplicates: Vec<&str> = headers
            .iter()
            .filter(|h| !seen.insert(h.as_str()))
            .map(String::as_str)
            .collect();
        CheckResult::failing(
            "header-uniqueness",
            "Header uniqueness",
            CheckStatus::Fail,
            Severity::High,
            format!("Duplicate column headers: {}", duplicates.join(", ")),
        )
        .with_details(format!(
            "headers={} distinct={}",
            headers.len(),
            distinct.len()
        ))
    }
}

fn check_row_length_consistency(rows: &RowsInput) -> CheckResult {
    let distinct_counts: HashSet<usize> = rows.raw_column_counts.iter().copied().collect();
    if distinct_counts.len() <= 1 {
        CheckResult::pass(
            "row-length",
            "Row length consistency",
            Severity::Medium,
            "All sampled rows have the same column count",
        )
    } else {
        let mut counts: Vec<usize> = distinct_counts.into_iter().collect();
        counts.sort_unstable();
        CheckResult::failing(
            "row-length",
            "Row length consistency",
            CheckStatus::Fail,
            Severity::Medium,
            format!(
                "Rows have inconsistent column counts: {}",
                counts
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    }
}

fn check_required_columns(headers: &[String], config: &CheckConfig) -> CheckResult {
    let missing: Vec<&str> = config
        .required_columns
        .iter()
        .filter(|required| !contains_ci(headers, required))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        CheckResult::pass(
            "required-columns",
            "Required columns",
            Severity::Medium,
            "All required columns are present",
        )
    } else {
        CheckResult::failing(
            "required-columns",
            "Required columns",
            CheckStatus::Warning,
            Severity::Medium,
            format!("Missing required columns: {}", missing.join(", ")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(headers: &[&str], counts: &[usize]) -> RowsInput {
        RowsInput {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            records: Vec::new(),
            raw_column_counts: counts.to_vec(),
        }
    }

    #[test]
    fn duplicate_headers_fail_high() {
        let results = run_structure_checks(
            &rows(&["name", "email", "email"], &[3, 3]),
            &CheckConfig::default(),
        );
        let header = &results[0];
        assert_eq!(header.status, CheckStatus::Fail);
        assert_eq!(header.severity, Severity::High);
        assert!(header.message.contains("email"));
    }

    #[test]
    fn unique_headers_pass() {
        let results =
            run_structure_checks(&rows(&["name", "email"], &[2, 2]), &CheckConfig::default());
        assert_eq!(results[0].status, CheckStatus::Pass);
    }

    #[test]
    fn ragged_rows_fail_medium() {
        let results =
            run_structure_checks(&rows(&["a", "b"], &[2, 3, 2]), &CheckConfig::default());
        let lengths = &results[1];
        assert_eq!(lengths.status, CheckStatus::Fail);
        assert_eq!(lengths.severity, Severity::Medium);
        assert!(lengths.message.contains('3'));
    }

    #[test]
    fn uniform_rows_pass() {
        let results = run_structure_checks(&rows(&["a", "b"], &[2, 2, 2]), &CheckConfig::default());
        assert_eq!(results[1].status, CheckStatus::Pass);
    }

    #[test]
    fn empty_table_counts_as_consistent() {
        let results = run_structure_checks(&rows(&[], &[]), &CheckConfig::default());
        assert_eq!(results[1].status, CheckStatus::Pass);
    }

    #[test]
    fn missing_required_column_warns_medium() {
        let config = CheckConfig {
            required_columns: vec!["Email".into(), "name".into()],
            ..CheckConfig::default()
        };
        let results = run_structure_checks(&rows(&["name", "age"], &[2]), &config);
        let required = &results[2];
        assert_eq!(required.status, CheckStatus::Warning);
        assert_eq!(required.severity, Severity::Medium);
        assert!(required.message.contains("Email"));
        assert!(!required.is_blocking());
    }

    #[test]
    fn required_column_match_is_case_insensitive() {
        let config = CheckConfig {
            required_columns: vec!["EMAIL".into()],
            ..CheckConfig::default()
        };
        let results = run_structure_checks(&rows(&["email"], &[1]), &config);
        assert_eq!(results[2].status, CheckStatus::Pass);
    }
}
