//! Aggregates rule-engine output into blocking, advisory, and passing
//! buckets and decides whether pipeline progression is blocked.

use serde::{Deserialize, Serialize};

use crate::checks::{CheckResult, CheckStatus, Severity};
use crate::stage::{Stage, StageStatus};

/// Rule-engine results partitioned by consequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedReport {
    /// `status = fail` and `severity = critical`: must be fixed or
    /// explicitly overridden before the stage advances.
    pub critical_failures: Vec<CheckResult>,
    /// Advisory: warning-status results plus warning-severity failures.
    pub warnings: Vec<CheckResult>,
    /// Everything else (passes and pending).
    pub passed: Vec<CheckResult>,
}

impl ClassifiedReport {
    /// True when at least one blocking result exists.
    pub fn is_blocked(&self) -> bool {
        !self.critical_failures.is_empty()
    }

    /// The stage status this run implies.
    pub fn stage_status(&self) -> StageStatus {
        if self.is_blocked() {
            StageStatus::Error
        } else if !self.warnings.is_empty() {
            StageStatus::Warning
        } else {
            StageStatus::Success
        }
    }
}

/// Partition check results per the progression rule.
pub fn classify(results: Vec<CheckResult>) -> ClassifiedReport {
    let mut critical_failures = Vec::new();
    let mut warnings = Vec::new();
    let mut passed = Vec::new();

    for result in results {
        if result.is_blocking() {
            critical_failures.push(result);
        } else if result.status == CheckStatus::Warning
            || (result.status == CheckStatus::Fail && result.severity == Severity::Warning)
        {
            warnings.push(result);
        } else if result.status == CheckStatus::Fail {
            // Non-critical, non-warning-severity failures are advisory
            // too: only critical failures block.
            warnings.push(result);
        } else {
            passed.push(result);
        }
    }

    ClassifiedReport {
        critical_failures,
        warnings,
        passed,
    }
}

/// An explicit user decision to advance past advisory issues. Never
/// produced automatically; always persisted to the audit trail so an
/// override is distinguishable from a clean pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideAction {
    pub stage: Stage,
    /// Number of advisory results outstanding at the moment of override.
    pub warnings_outstanding: usize,
    /// User-supplied justification.
    pub reason: String,
}

impl OverrideAction {
    /// Build an override for a report. Returns `None` when the report
    /// is blocked: criticals can never be overridden.
    pub fn for_report(stage: Stage, report: &ClassifiedReport, reason: String) -> Option<Self> {
        if report.is_blocked() {
            return None;
        }
        Some(Self {
            stage,
            warnings_outstanding: report.warnings.len(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, status: CheckStatus, severity: Severity) -> CheckResult {
        CheckResult {
            id: id.into(),
            name: id.into(),
            status,
            severity,
            message: String::new(),
            technical_details: String::new(),
            affected_rows: Vec::new(),
        }
    }

    #[test]
    fn critical_fail_is_the_only_blocker() {
        let report = classify(vec![
            result("a", CheckStatus::Fail, Severity::Critical),
            result("b", CheckStatus::Fail, Severity::High),
            result("c", CheckStatus::Warning, Severity::Medium),
            result("d", CheckStatus::Pass, Severity::Critical),
        ]);
        assert_eq!(report.critical_failures.len(), 1);
        assert_eq!(report.critical_failures[0].id, "a");
        assert!(report.is_blocked());
        assert_eq!(report.stage_status(), StageStatus::Error);
    }

    #[test]
    fn warning_severity_failures_are_advisory() {
        let report = classify(vec![result("a", CheckStatus::Fail, Severity::Warning)]);
        assert!(!report.is_blocked());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.stage_status(), StageStatus::Warning);
    }

    #[test]
    fn high_severity_failures_do_not_block() {
        let report = classify(vec![result("a", CheckStatus::Fail, Severity::High)]);
        assert!(!report.is_blocked());
        assert_eq!(report.stage_status(), StageStatus::Warning);
    }

    #[test]
    fn all_passing_is_success() {
        let report = classify(vec![
            result("a", CheckStatus::Pass, Severity::Critical),
            result("b", CheckStatus::Pass, Severity::High),
        ]);
        assert!(!report.is_blocked());
        assert!(report.warnings.is_empty());
        assert_eq!(report.passed.len(), 2);
        assert_eq!(report.stage_status(), StageStatus::Success);
    }

    #[test]
    fn empty_report_is_success() {
        let report = classify(Vec::new());
        assert_eq!(report.stage_status(), StageStatus::Success);
    }

    #[test]
    fn override_refused_while_blocked() {
        let report = classify(vec![result("a", CheckStatus::Fail, Severity::Critical)]);
        assert!(OverrideAction::for_report(Stage::FileUpload, &report, "because".into()).is_none());
    }

    #[test]
    fn override_records_outstanding_warnings() {
        let report = classify(vec![
            result("a", CheckStatus::Warning, Severity::Medium),
            result("b", CheckStatus::Warning, Severity::Low),
        ]);
        let action =
            OverrideAction::for_report(Stage::DataValidation, &report, "approved by lead".into())
                .expect("override allowed");
        assert_eq!(action.warnings_outstanding, 2);
        assert_eq!(action.stage, Stage::DataValidation);
    }
}
