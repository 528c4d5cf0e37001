//! Pipeline stages and the per-session stage status tracker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifiedReport;
use crate::error::CoreError;

/// One named step of the import wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    FileUpload,
    FieldMapping,
    DataPreflight,
    DataValidation,
    DataVerification,
    FinalReview,
    ImportPush,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 7] = [
        Stage::FileUpload,
        Stage::FieldMapping,
        Stage::DataPreflight,
        Stage::DataValidation,
        Stage::DataVerification,
        Stage::FinalReview,
        Stage::ImportPush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileUpload => "FileUpload",
            Self::FieldMapping => "FieldMapping",
            Self::DataPreflight => "DataPreflight",
            Self::DataValidation => "DataValidation",
            Self::DataVerification => "DataVerification",
            Self::FinalReview => "FinalReview",
            Self::ImportPush => "ImportPush",
        }
    }

    /// The stage after this one, if any.
    pub fn next(&self) -> Option<Stage> {
        let index = Self::ALL.iter().position(|s| s == self)?;
        Self::ALL.get(index + 1).copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| CoreError::Validation(format!("unknown stage '{s}'")))
    }
}

/// Per-stage status. Strings rather than booleans because three
/// non-binary situations matter: not-yet-run, advisory issues present,
/// and blocking issues present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    NotStarted,
    InProgress,
    Warning,
    Success,
    Error,
    VerificationPending,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Warning => "Warning",
            Self::Success => "Success",
            Self::Error => "Error",
            Self::VerificationPending => "Verification Pending",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Not Started" => Ok(Self::NotStarted),
            "In Progress" => Ok(Self::InProgress),
            "Warning" => Ok(Self::Warning),
            "Success" => Ok(Self::Success),
            "Error" => Ok(Self::Error),
            "Verification Pending" => Ok(Self::VerificationPending),
            other => Err(CoreError::Validation(format!(
                "unknown stage status '{other}'"
            ))),
        }
    }
}

/// The single source of truth for per-stage progress within one import
/// session. Navigation gating must consult this tracker, never local
/// view state; only the stage dispatcher mutates it.
#[derive(Debug, Clone, Default)]
pub struct StageStatusTracker {
    statuses: HashMap<Stage, StageStatus>,
    critical_counts: HashMap<Stage, usize>,
    warning_counts: HashMap<Stage, usize>,
}

impl StageStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status for a stage; stages that never ran are Not Started.
    pub fn get_status(&self, stage: Stage) -> StageStatus {
        self.statuses
            .get(&stage)
            .copied()
            .unwrap_or(StageStatus::NotStarted)
    }

    pub fn set_status(&mut self, stage: Stage, status: StageStatus) {
        self.statuses.insert(stage, status);
    }

    /// Record a classified rule-engine run for a stage: status plus the
    /// counts `can_advance` gates on.
    pub fn record_report(&mut self, stage: Stage, report: &ClassifiedReport) {
        self.statuses.insert(stage, report.stage_status());
        self.critical_counts
            .insert(stage, report.critical_failures.len());
        self.warning_counts.insert(stage, report.warnings.len());
    }

    /// A stage may advance only when its critical-failure count is zero.
    /// A stage that never ran has nothing blocking it.
    pub fn can_advance(&self, stage: Stage) -> bool {
        self.critical_counts.get(&stage).copied().unwrap_or(0) == 0
    }

    pub fn critical_count(&self, stage: Stage) -> usize {
        self.critical_counts.get(&stage).copied().unwrap_or(0)
    }

    pub fn warning_count(&self, stage: Stage) -> usize {
        self.warning_counts.get(&stage).copied().unwrap_or(0)
    }
}
