//! The correction session: an editable working copy of a flagged
//! result set, with single-cell and batch-propagated commits.
//!
//! The propagation decision is modeled as an explicit state
//! (`AwaitingPropagationChoice`) rather than a dialog callback: whenever
//! a commit changes a value, the session parks in that state until the
//! caller answers the propagate question. Commits are applied in the
//! order they are confirmed, re-validated by the rule engine, and only
//! then merged into the committed Record set. Abandoning the session
//! never touches committed Records.

use serde::{Deserialize, Serialize};

use crate::checks::{
    quality, CheckConfig, CheckResult, CheckStatus, RowsInput,
};
use crate::error::CoreError;
use crate::record::{cell_str, Record};

/// One flagged cell opened for editing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionItem {
    pub row_index: usize,
    pub field_name: String,
    pub original_value: String,
    pub corrected_value: String,
    /// Engine-suggested replacement, when one exists.
    pub suggested_value: Option<String>,
    /// Groups items that share the same original value.
    pub group_id: Option<String>,
}

/// A commit waiting on the propagate decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommit {
    pub row_index: usize,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
}

/// Where the session currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    AwaitingPropagationChoice(PendingCommit),
}

/// One confirmed commit, in confirmation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedEdit {
    pub row_index: usize,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub propagated: bool,
    /// Every row the commit touched (the originating row plus any
    /// propagation targets).
    pub applied_rows: Vec<usize>,
}

/// Outcome of a confirmed commit.
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub applied_rows: Vec<usize>,
    /// Rule-engine results for the touched rows that still fail or
    /// warn. A commit whose value still violates the field's checks
    /// must not silently pass.
    pub violations: Vec<CheckResult>,
}

impl CommitResult {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// What `begin_commit` did.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// Old and new value were identical; applied without asking.
    Applied(CommitResult),
    /// The value changed; the caller must answer the propagate question
    /// via [`CorrectionSession::resolve_propagation`].
    AwaitingChoice,
}

/// An exclusive, editable working copy over a committed Record set.
#[derive(Debug, Clone)]
pub struct CorrectionSession {
    committed: Vec<Record>,
    working: Vec<Record>,
    items: Vec<CorrectionItem>,
    state: SessionState,
    commit_log: Vec<CommittedEdit>,
    config: CheckConfig,
    headers: Vec<String>,
}

impl CorrectionSession {
    /// Open a session for the rows a check flagged.
    ///
    /// `field_name` is the column under correction (the check's
    /// affected rows carry values for exactly one field). Items sharing
    /// an original value share a `group_id`.
    pub fn from_check(
        records: Vec<Record>,
        check: &CheckResult,
        field_name: &str,
        config: CheckConfig,
    ) -> Self {
        let headers: Vec<String> = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();

        let items = check
            .affected_rows
            .iter()
            .map(|row| CorrectionItem {
                row_index: row.row_index,
                field_name: field_name.to_string(),
                original_value: row.value.clone(),
                corrected_value: row.value.clone(),
                suggested_value: None,
                group_id: Some(format!("{field_name}:{}", row.value.to_lowercase())),
            })
            .collect();

        Self {
            working: records.clone(),
            committed: records,
            items,
            state: SessionState::Editing,
            commit_log: Vec::new(),
            config,
            headers,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn items(&self) -> &[CorrectionItem] {
        &self.items
    }

    /// The committed Record set (untouched by in-flight edits).
    pub fn committed_records(&self) -> &[Record] {
        &self.committed
    }

    /// The editable working copy.
    pub fn working_records(&self) -> &[Record] {
        &self.working
    }

    /// Confirmed commits in the order the user confirmed them.
    pub fn commit_log(&self) -> &[CommittedEdit] {
        &self.commit_log
    }

    /// Attach an engine suggestion to an item.
    pub fn set_suggestion(&mut self, item_index: usize, value: &str) -> Result<(), CoreError> {
        let item = self.item_mut(item_index)?;
        item.suggested_value = Some(value.to_string());
        Ok(())
    }

    /// Edit one cell in the working copy. The committed Records are
    /// never mutated by an edit.
    pub fn edit_cell(
        &mut self,
        row_index: usize,
        field: &str,
        new_value: &str,
    ) -> Result<(), CoreError> {
        self.require_editing()?;
        let record = self.working.get_mut(row_index).ok_or_else(|| {
            CoreError::Validation(format!("row index {row_index} out of bounds"))
        })?;
        record.insert(field.to_string(), new_value.into());

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.row_index == row_index && i.field_name == field)
        {
            item.corrected_value = new_value.to_string();
        }
        Ok(())
    }

    /// Apply the engine suggestion to a single item, leaving every
    /// other item untouched.
    pub fn accept_suggestion(&mut self, item_index: usize) -> Result<(), CoreError> {
        self.require_editing()?;
        let item = self.item_mut(item_index)?;
        let suggested = item.suggested_value.clone().ok_or_else(|| {
            CoreError::Validation("item has no suggested value".to_string())
        })?;
        let (row_index, field) = (item.row_index, item.field_name.clone());
        self.edit_cell(row_index, &field, &suggested)
    }

    /// Items passing the active search filter: empty filter matches
    /// everything; otherwise case-insensitive substring match against
    /// the field name and both values.
    pub fn visible_items(&self, filter: &str) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches_filter(item, filter))
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply suggestions to every item currently passing the filter —
    /// the scope is exactly the filtered view, not the full item set.
    /// Items without a suggestion are skipped. Returns how many items
    /// changed.
    pub fn accept_all_visible(&mut self, filter: &str) -> Result<usize, CoreError> {
        self.require_editing()?;
        let visible = self.visible_items(filter);
        let mut applied = 0;
        for index in visible {
            if self.items[index].suggested_value.is_some() {
                self.accept_suggestion(index)?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Restore an item's corrected value (and its working cell) to the
    /// original value.
    pub fn reset(&mut self, item_index: usize) -> Result<(), CoreError> {
        self.require_editing()?;
        let item = self.item_mut(item_index)?;
        let (row_index, field, original) = (
            item.row_index,
            item.field_name.clone(),
            item.original_value.clone(),
        );
        self.edit_cell(row_index, &field, &original)
    }

    /// Start committing one cell. When the value is unchanged the
    /// commit applies immediately; otherwise the session parks in
    /// `AwaitingPropagationChoice` until the caller decides, via
    /// [`resolve_propagation`](Self::resolve_propagation), whether the
    /// edit applies to every identical value in the field.
    pub fn begin_commit(
        &mut self,
        row_index: usize,
        field: &str,
        new_value: &str,
    ) -> Result<CommitOutcome, CoreError> {
        self.require_editing()?;
        let old_value = self
            .committed
            .get(row_index)
            .and_then(|r| cell_str(r, field))
            .ok_or_else(|| {
                CoreError::Validation(format!("no cell at row {row_index}, field '{field}'"))
            })?;

        let pending = PendingCommit {
            row_index,
            field_name: field.to_string(),
            old_value: old_value.clone(),
            new_value: new_value.to_string(),
        };

        if old_value == new_value {
            // Nothing to propagate; commit the single cell directly.
            let result = self.apply_commit(pending, false)?;
            return Ok(CommitOutcome::Applied(result));
        }

        self.state = SessionState::AwaitingPropagationChoice(pending);
        Ok(CommitOutcome::AwaitingChoice)
    }

    /// Answer the propagate question for the pending commit.
    ///
    /// `propagate = true` rewrites every cell in the working set that
    /// holds exactly the old value in the same field; `false` touches
    /// only the originating cell.
    pub fn resolve_propagation(&mut self, propagate: bool) -> Result<CommitResult, CoreError> {
        let pending = match std::mem::replace(&mut self.state, SessionState::Editing) {
            SessionState::AwaitingPropagationChoice(pending) => pending,
            SessionState::Editing => {
                return Err(CoreError::Conflict(
                    "no commit is awaiting a propagation choice".to_string(),
                ))
            }
        };
        self.apply_commit(pending, propagate)
    }

    /// Drop all in-flight edits; the committed Record set is untouched.
    pub fn abandon(&mut self) {
        self.working = self.committed.clone();
        self.state = SessionState::Editing;
        for item in &mut self.items {
            item.corrected_value = item.original_value.clone();
        }
    }

    // Applies a confirmed commit: mutate working + committed, log the
    // edit, drop merged items, then re-validate the touched rows.
    fn apply_commit(
        &mut self,
        pending: PendingCommit,
        propagate: bool,
    ) -> Result<CommitResult, CoreError> {
        let PendingCommit {
            row_index,
            field_name,
            old_value,
            new_value,
        } = pending;

        let mut applied_rows = vec![row_index];
        if propagate {
            for (i, record) in self.working.iter().enumerate() {
                if i != row_index
                    && cell_str(record, &field_name).as_deref() == Some(old_value.as_str())
                {
                    applied_rows.push(i);
                }
            }
            applied_rows.sort_unstable();
        }

        for &i in &applied_rows {
            self.working[i].insert(field_name.clone(), new_value.clone().into());
            self.committed[i].insert(field_name.clone(), new_value.clone().into());
        }

        // Items for the merged cells are destroyed on commit.
        self.items
            .retain(|item| !(item.field_name == field_name && applied_rows.contains(&item.row_index)));

        self.commit_log.push(CommittedEdit {
            row_index,
            field_name: field_name.clone(),
            old_value,
            new_value,
            propagated: propagate,
            applied_rows: applied_rows.clone(),
        });

        let violations = self.revalidate(&applied_rows);
        Ok(CommitResult {
            applied_rows,
            violations,
        })
    }

    // Re-run the quality rule set over the touched rows and keep
    // everything that still fails or warns.
    fn revalidate(&self, touched: &[usize]) -> Vec<CheckResult> {
        let records: Vec<Record> = touched
            .iter()
            .filter_map(|&i| self.committed.get(i).cloned())
            .collect();
        let input = RowsInput {
            headers: self.headers.clone(),
            raw_column_counts: vec![self.headers.len(); records.len()],
            records,
        };
        quality::run_quality_checks(&input, &self.config)
            .into_iter()
            .filter(|r| matches!(r.status, CheckStatus::Fail | CheckStatus::Warning))
            .collect()
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut CorrectionItem, CoreError> {
        self.items
            .get_mut(index)
            .ok_or_else(|| CoreError::Validation(format!("item index {index} out of bounds")))
    }

    fn require_editing(&self) -> Result<(), CoreError> {
        match self.state {
            SessionState::Editing => Ok(()),
            SessionState::AwaitingPropagationChoice(_) => Err(CoreError::Conflict(
                "a commit is awaiting a propagation choice".to_string(),
            )),
        }
    }
}

fn matches_filter(item: &CorrectionItem, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    let needle = filter.to_lowercase();
    item.field_name.to_lowercase().contains(&needle)
        || item.original_value.to_lowercase().contains(&needle)
        || item.corrected_value.to_lowercase().contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{AffectedRow, Severity};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    fn city_check(rows: &[Record], flagged: &[usize]) -> CheckResult {
        CheckResult {
            id: "char-limit".into(),
            name: "Character limits".into(),
            status: CheckStatus::Fail,
            severity: Severity::High,
            message: String::new(),
            technical_details: String::new(),
            affected_rows: flagged
                .iter()
                .map(|&i| AffectedRow {
                    row_index: i,
                    value: cell_str(&rows[i], "city").unwrap(),
                    row_data: rows[i].clone(),
                })
                .collect(),
        }
    }

    fn three_city_rows() -> Vec<Record> {
        vec![
            record(&[("name", "Ada"), ("city", "NY")]),
            record(&[("name", "Grace"), ("city", "NY")]),
            record(&[("name", "Edsger"), ("city", "Austin")]),
        ]
    }

    fn session() -> CorrectionSession {
        let rows = three_city_rows();
        let check = city_check(&rows, &[0, 1]);
        CorrectionSession::from_check(rows, &check, "city", CheckConfig::default())
    }

    #[test]
    fn edit_cell_touches_working_copy_only() {
        let mut s = session();
        s.edit_cell(0, "city", "New York").unwrap();
        assert_eq!(cell_str(&s.working_records()[0], "city").as_deref(), Some("New York"));
        assert_eq!(cell_str(&s.committed_records()[0], "city").as_deref(), Some("NY"));
        assert_eq!(s.items()[0].corrected_value, "New York");
    }

    #[test]
    fn reset_restores_original_after_any_edits() {
        let mut s = session();
        s.set_suggestion(0, "New York City").unwrap();
        s.edit_cell(0, "city", "Gotham").unwrap();
        s.accept_suggestion(0).unwrap();
        s.reset(0).unwrap();
        assert_eq!(s.items()[0].corrected_value, s.items()[0].original_value);
        assert_eq!(cell_str(&s.working_records()[0], "city").as_deref(), Some("NY"));
    }

    #[test]
    fn accept_suggestion_leaves_other_items_untouched() {
        let mut s = session();
        s.set_suggestion(0, "New York").unwrap();
        s.accept_suggestion(0).unwrap();
        assert_eq!(s.items()[0].corrected_value, "New York");
        assert_eq!(s.items()[1].corrected_value, "NY");
    }

    #[test]
    fn accept_all_visible_respects_the_filter() {
        let rows = vec![
            record(&[("city", "NY")]),
            record(&[("city", "LA")]),
            record(&[("city", "NY")]),
        ];
        let check = city_check(&rows, &[0, 1, 2]);
        let mut s = CorrectionSession::from_check(rows, &check, "city", CheckConfig::default());
        for i in 0..3 {
            s.set_suggestion(i, "Fixed").unwrap();
        }

        // Only the two NY items pass the filter.
        let applied = s.accept_all_visible("ny").unwrap();
        assert_eq!(applied, 2);
        assert_eq!(s.items()[0].corrected_value, "Fixed");
        assert_eq!(s.items()[1].corrected_value, "LA");
        assert_eq!(s.items()[2].corrected_value, "Fixed");
    }

    #[test]
    fn changed_value_always_asks_for_propagation_choice() {
        let mut s = session();
        let outcome = s.begin_commit(0, "city", "New York").unwrap();
        assert_matches!(outcome, CommitOutcome::AwaitingChoice);
        assert_matches!(s.state(), SessionState::AwaitingPropagationChoice(_));

        // Further edits are refused until the choice is made.
        assert_matches!(
            s.edit_cell(2, "city", "ATX").unwrap_err(),
            CoreError::Conflict(_)
        );
    }

    #[test]
    fn unchanged_value_commits_without_asking() {
        let mut s = session();
        let outcome = s.begin_commit(0, "city", "NY").unwrap();
        assert_matches!(outcome, CommitOutcome::Applied(_));
        assert_eq!(s.state(), &SessionState::Editing);
    }

    #[test]
    fn propagate_true_updates_exactly_the_matching_cells() {
        let mut s = session();
        s.begin_commit(0, "city", "New York").unwrap();
        let result = s.resolve_propagation(true).unwrap();

        assert_eq!(result.applied_rows, vec![0, 1]);
        assert_eq!(cell_str(&s.committed_records()[0], "city").as_deref(), Some("New York"));
        assert_eq!(cell_str(&s.committed_records()[1], "city").as_deref(), Some("New York"));
        assert_eq!(cell_str(&s.committed_records()[2], "city").as_deref(), Some("Austin"));
    }

    #[test]
    fn propagate_false_changes_only_the_originating_row() {
        // 3 rows, two holding "NY".
        let mut s = session();
        s.begin_commit(0, "city", "New York").unwrap();
        let result = s.resolve_propagation(false).unwrap();

        assert_eq!(result.applied_rows, vec![0]);
        assert_eq!(cell_str(&s.committed_records()[0], "city").as_deref(), Some("New York"));
        assert_eq!(cell_str(&s.committed_records()[1], "city").as_deref(), Some("NY"));
    }

    #[test]
    fn committed_items_are_merged_away() {
        let mut s = session();
        s.begin_commit(0, "city", "New York").unwrap();
        s.resolve_propagation(true).unwrap();
        assert!(s.items().is_empty());
        assert_eq!(s.commit_log().len(), 1);
        assert!(s.commit_log()[0].propagated);
    }

    #[test]
    fn commits_are_logged_in_confirmation_order() {
        let mut s = session();
        s.begin_commit(0, "city", "New York").unwrap();
        s.resolve_propagation(false).unwrap();
        s.begin_commit(1, "city", "NYC").unwrap();
        s.resolve_propagation(false).unwrap();

        let log: Vec<&str> = s.commit_log().iter().map(|e| e.new_value.as_str()).collect();
        assert_eq!(log, vec!["New York", "NYC"]);
    }

    #[test]
    fn commit_that_still_violates_is_not_silently_clean() {
        let rows = vec![record(&[("email", "not-an-email")])];
        let check = CheckResult {
            id: "email-format".into(),
            name: "Email format".into(),
            status: CheckStatus::Warning,
            severity: Severity::Warning,
            message: String::new(),
            technical_details: String::new(),
            affected_rows: vec![AffectedRow {
                row_index: 0,
                value: "not-an-email".into(),
                row_data: rows[0].clone(),
            }],
        };
        let mut s = CorrectionSession::from_check(rows, &check, "email", CheckConfig::default());

        s.begin_commit(0, "email", "still-not-an-email").unwrap();
        let result = s.resolve_propagation(false).unwrap();
        assert!(!result.is_clean());
        assert!(result.violations.iter().any(|v| v.id == "email-format"));

        // A genuinely fixed value reports clean.
        s.begin_commit(0, "email", "ada@example.com").unwrap();
        let result = s.resolve_propagation(false).unwrap();
        assert!(result.is_clean());
    }

    #[test]
    fn abandon_discards_in_flight_edits() {
        let mut s = session();
        s.edit_cell(0, "city", "Gotham").unwrap();
        s.begin_commit(1, "city", "Metropolis").unwrap();
        s.abandon();

        assert_eq!(s.state(), &SessionState::Editing);
        assert_eq!(cell_str(&s.working_records()[0], "city").as_deref(), Some("NY"));
        assert_eq!(cell_str(&s.committed_records()[1], "city").as_deref(), Some("NY"));
    }

    #[test]
    fn resolve_without_pending_commit_is_a_conflict() {
        let mut s = session();
        assert_matches!(s.resolve_propagation(true).unwrap_err(), CoreError::Conflict(_));
    }

    #[test]
    fn items_with_equal_values_share_a_group() {
        let s = session();
        assert_eq!(s.items()[0].group_id, s.items()[1].group_id);
    }
}
