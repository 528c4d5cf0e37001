//! Column-mapping checks: required coverage, duplicate targets, and
//! name-pattern compatibility between source columns and target fields.

use std::collections::HashMap;

use super::{CheckResult, CheckStatus, MappingInput, Severity};

/// Name fragments whose presence on one side of a mapping but not the
/// other suggests an incompatible assignment.
const NAME_PATTERNS: &[&str] = &["email", "date", "phone"];

/// Minimum fraction of source columns that should have been mapped.
const MIN_COVERAGE: f64 = 0.5;

/// Run the column-mapping rule set in its fixed order.
pub fn run_mapping_checks(input: &MappingInput) -> Vec<CheckResult> {
    vec![
        check_required_targets_mapped(input),
        check_duplicate_targets(input),
        check_name_compatibility(input),
        check_mapping_coverage(input),
    ]
}

fn check_required_targets_mapped(input: &MappingInput) -> CheckResult {
    let unmapped: Vec<&str> = input
        .target_fields
        .iter()
        .filter(|field| field.required)
        .filter(|field| {
            !input
                .mappings
                .iter()
                .any(|m| m.target_field.eq_ignore_ascii_case(&field.name))
        })
        .map(|field| field.name.as_str())
        .collect();

    if unmapped.is_empty() {
        CheckResult::pass(
            "required-targets",
            "Required target fields",
            Severity::Critical,
            "All required target fields are mapped",
        )
    } else {
        CheckResult::failing(
            "required-targets",
            "Required target fields",
            CheckStatus::Fail,
            Severity::Critical,
            format!("Required target fields left unmapped: {}", unmapped.join(", ")),
        )
    }
}

fn check_duplicate_targets(input: &MappingInput) -> CheckResult {
    let mut target_to_sources: HashMap<String, Vec<&str>> = HashMap::new();
    for mapping in &input.mappings {
        target_to_sources
            .entry(mapping.target_field.to_lowercase())
            .or_default()
            .push(mapping.source_column.as_str());
    }

    let mut duplicated: Vec<(String, Vec<&str>)> = target_to_sources
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect();
    duplicated.sort_by(|a, b| a.0.cmp(&b.0));

    if duplicated.is_empty() {
        CheckResult::pass(
            "duplicate-mapping",
            "Duplicate target mapping",
            Severity::High,
            "Each target field receives at most one source column",
        )
    } else {
        let description = duplicated
            .iter()
            .map(|(target, sources)| format!("'{target}' <- [{}]", sources.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        CheckResult::failing(
            "duplicate-mapping",
            "Duplicate target mapping",
            CheckStatus::Fail,
            Severity::High,
            format!("Multiple source columns mapped to the same target: {description}"),
        )
    }
}

fn check_name_compatibility(input: &MappingInput) -> CheckResult {
    let mut mismatches = Vec::new();

    for mapping in &input.mappings {
        let source = mapping.source_column.to_lowercase();
        let target = mapping.target_field.to_lowercase();
        for pattern in NAME_PATTERNS {
            if source.contains(pattern) != target.contains(pattern) {
                mismatches.push(format!(
                    "'{}' -> '{}' ({pattern})",
                    mapping.source_column, mapping.target_field
                ));
                break;
            }
        }
    }

    if mismatches.is_empty() {
        CheckResult::pass(
            "name-compatibility",
            "Name pattern compatibility",
            Severity::Medium,
            "Source and target names look compatible",
        )
    } else {
        CheckResult::failing(
            "name-compatibility",
            "Name pattern compatibility",
            CheckStatus::Warning,
            Severity::Medium,
            format!("Possibly incompatible mappings: {}", mismatches.join(", ")),
        )
    }
}

fn check_mapping_coverage(input: &MappingInput) -> CheckResult {
    if input.source_columns.is_empty() {
        return CheckResult::pass(
            "mapping-coverage",
            "Mapping coverage",
            Severity::Low,
            "No source columns to cover",
        );
    }

    let mapped = input
        .source_columns
        .iter()
        .filter(|column| {
            input
                .mappings
                .iter()
                .any(|m| m.source_column.eq_ignore_ascii_case(column))
        })
        .count();
    let ratio = mapped as f64 / input.source_columns.len() as f64;

    if ratio >= MIN_COVERAGE {
        CheckResult::pass(
            "mapping-coverage",
            "Mapping coverage",
            Severity::Low,
            "Auto-mapping covered most source columns",
        )
        .with_details(format!("mapped {mapped}/{}", input.source_columns.len()))
    } else {
        CheckResult::failing(
            "mapping-coverage",
            "Mapping coverage",
            CheckStatus::Warning,
            Severity::Low,
            format!(
                "Only {mapped} of {} source columns were mapped",
                input.source_columns.len()
            ),
        )
    }
}
