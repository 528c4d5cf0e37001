//! The master-data reconciler: maps observed raw values onto canonical
//! master records, section by section.
//!
//! Per-section state machine:
//! `Loading -> Presenting -> Confirming -> Submitted -> {next section | finished}`.
//! A candidate is resolved by selecting an existing master item or, by
//! default, submitted as a new insert under the `"-100"` sentinel.
//! Marked candidates are hidden from the active view but retained for
//! audit.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Sentinel `updated_id` meaning "insert as a new canonical record
/// using the original value".
pub const NEW_INSERT_ID: &str = "-100";

/// A canonical master reference record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDataItem {
    pub value: String,
    pub display: String,
    /// Namespace for product-like sections; canonical values live in
    /// per-type namespaces.
    pub parent_type: Option<String>,
}

/// One observed raw value awaiting reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDataCandidate {
    pub current_value: String,
    pub updated_value: Option<String>,
    pub updated_id: Option<String>,
    pub is_new_insert: bool,
    /// Terminal within this resolution pass: set when a submission
    /// containing this candidate succeeds.
    pub is_marked: bool,
    pub parent_type: Option<String>,
}

impl MasterDataCandidate {
    pub fn new(current_value: &str, parent_type: Option<String>) -> Self {
        Self {
            current_value: current_value.to_string(),
            updated_value: None,
            updated_id: None,
            is_new_insert: true,
            is_marked: false,
            parent_type,
        }
    }
}

/// One field-category queued for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub column_name: String,
    pub parent_type: Option<String>,
    pub alias_name: String,
}

/// Where the current section is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPhase {
    Loading,
    Presenting,
    /// A submission batch has been captured and awaits the collaborator
    /// response.
    Confirming,
    Submitted,
}

/// What advancing past a completed section yields.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileProgress {
    NextSection(Section),
    Finished,
}

/// Drives the section-by-section resolution workflow.
#[derive(Debug, Clone)]
pub struct Reconciler {
    sections: Vec<Section>,
    current: usize,
    candidates: Vec<MasterDataCandidate>,
    master: Vec<MasterDataItem>,
    phase: SectionPhase,
    /// Indices of the candidates captured by the in-flight submission.
    pending_submission: Vec<usize>,
}

impl Reconciler {
    /// Start the workflow over an ordered section queue.
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            current: 0,
            candidates: Vec::new(),
            master: Vec::new(),
            phase: SectionPhase::Loading,
            pending_submission: Vec::new(),
        }
    }

    pub fn phase(&self) -> &SectionPhase {
        &self.phase
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.sections.get(self.current)
    }

    pub fn candidates(&self) -> &[MasterDataCandidate] {
        &self.candidates
    }

    /// Candidates still shown to the user: everything unmarked.
    pub fn visible_candidates(&self) -> Vec<&MasterDataCandidate> {
        self.candidates.iter().filter(|c| !c.is_marked).collect()
    }

    /// The canonical list for the current section, scoped to a
    /// candidate's parent type when one is set.
    pub fn master_items_for(&self, candidate: &MasterDataCandidate) -> Vec<&MasterDataItem> {
        self.master
            .iter()
            .filter(|item| match &candidate.parent_type {
                Some(parent) => item.parent_type.as_deref() == Some(parent.as_str()),
                None => true,
            })
            .collect()
    }

    /// Finish loading a section: install its missing-value candidates
    /// and the canonical list scoped to the section's parent type.
    pub fn load_section(
        &mut self,
        candidates: Vec<MasterDataCandidate>,
        master: Vec<MasterDataItem>,
    ) -> Result<(), CoreError> {
        if self.phase != SectionPhase::Loading {
            return Err(CoreError::Conflict(format!(
                "section is not loading (phase {:?})",
                self.phase
            )));
        }
        if self.current_section().is_none() {
            return Err(CoreError::Conflict("no section queued".to_string()));
        }
        self.candidates = candidates;
        self.master = master;
        self.phase = SectionPhase::Presenting;
        Ok(())
    }

    /// Resolve a candidate against an existing canonical item.
    pub fn select_master(
        &mut self,
        candidate_index: usize,
        item: &MasterDataItem,
    ) -> Result<(), CoreError> {
        self.require_presenting()?;
        let candidate = self.candidate_mut(candidate_index)?;
        if candidate.is_marked {
            return Err(CoreError::Conflict(
                "candidate is already marked".to_string(),
            ));
        }
        candidate.updated_id = Some(item.value.clone());
        candidate.updated_value = Some(item.display.clone());
        candidate.is_new_insert = false;
        Ok(())
    }

    /// Switch a product-like candidate's sub-type. The prior match is
    /// invalidated because canonical values live in per-type
    /// namespaces, so the selection is cleared.
    pub fn switch_parent_type(
        &mut self,
        candidate_index: usize,
        new_type: &str,
    ) -> Result<(), CoreError> {
        self.require_presenting()?;
        let candidate = self.candidate_mut(candidate_index)?;
        if candidate.is_marked {
            return Err(CoreError::Conflict(
                "candidate is already marked".to_string(),
            ));
        }
        candidate.parent_type = Some(new_type.to_string());
        candidate.updated_id = None;
        candidate.updated_value = None;
        candidate.is_new_insert = true;
        Ok(())
    }

    /// Capture the submission batch: every unmarked candidate, with the
    /// new-insert sentinel applied to unselected ones. Moves the
    /// section to `Confirming`; the returned batch is what goes to the
    /// collaborator in one request.
    pub fn begin_submit(&mut self) -> Result<Vec<MasterDataCandidate>, CoreError> {
        self.require_presenting()?;

        let pending: Vec<usize> = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_marked)
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Err(CoreError::Conflict(
                "nothing to submit: all candidates are marked".to_string(),
            ));
        }

        let batch: Vec<MasterDataCandidate> = pending
            .iter()
            .map(|&i| {
                let mut c = self.candidates[i].clone();
                if c.updated_id.is_none() {
                    c.updated_id = Some(NEW_INSERT_ID.to_string());
                    c.updated_value = Some(c.current_value.clone());
                    c.is_new_insert = true;
                }
                c
            })
            .collect();

        self.pending_submission = pending;
        self.phase = SectionPhase::Confirming;
        Ok(batch)
    }

    /// Record the collaborator's response. Success marks exactly the
    /// submitted subset; failure returns the section to `Presenting`
    /// with nothing marked.
    pub fn complete_submit(&mut self, success: bool) -> Result<(), CoreError> {
        if self.phase != SectionPhase::Confirming {
            return Err(CoreError::Conflict(
                "no submission in flight".to_string(),
            ));
        }
        if success {
            for &i in &self.pending_submission {
                let candidate = &mut self.candidates[i];
                if candidate.updated_id.is_none() {
                    candidate.updated_id = Some(NEW_INSERT_ID.to_string());
                    candidate.updated_value = Some(candidate.current_value.clone());
                    candidate.is_new_insert = true;
                }
                candidate.is_marked = true;
            }
            self.phase = SectionPhase::Submitted;
        } else {
            self.phase = SectionPhase::Presenting;
        }
        self.pending_submission.clear();
        Ok(())
    }

    /// Mark a subset directly (partial acceptance from the
    /// collaborator). Only the given candidates are marked.
    pub fn mark_candidates(&mut self, indices: &[usize]) -> Result<(), CoreError> {
        for &i in indices {
            self.candidate_mut(i)?.is_marked = true;
        }
        Ok(())
    }

    /// A section is complete when every candidate is marked.
    pub fn section_complete(&self) -> bool {
        self.candidates.iter().all(|c| c.is_marked)
    }

    /// Advance past a completed section to the next one, or declare the
    /// workflow finished when the queue is exhausted.
    pub fn advance(&mut self) -> Result<ReconcileProgress, CoreError> {
        if !self.section_complete() {
            return Err(CoreError::Conflict(
                "section has unmarked candidates".to_string(),
            ));
        }
        self.current += 1;
        self.candidates.clear();
        self.master.clear();
        self.pending_submission.clear();
        self.phase = SectionPhase::Loading;

        match self.current_section() {
            Some(section) => Ok(ReconcileProgress::NextSection(section.clone())),
            None => Ok(ReconcileProgress::Finished),
        }
    }

    fn candidate_mut(&mut self, index: usize) -> Result<&mut MasterDataCandidate, CoreError> {
        self.candidates.get_mut(index).ok_or_else(|| {
            CoreError::Validation(format!("candidate index {index} out of bounds"))
        })
    }

    fn require_presenting(&self) -> Result<(), CoreError> {
        if self.phase == SectionPhase::Presenting {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "section is not presenting (phase {:?})",
                self.phase
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sections() -> Vec<Section> {
        vec![
            Section {
                column_name: "product_name".into(),
                parent_type: Some("product".into()),
                alias_name: "Product Name".into(),
            },
            Section {
                column_name: "company".into(),
                parent_type: None,
                alias_name: "Company".into(),
            },
        ]
    }

    fn item(value: &str, display: &str, parent: Option<&str>) -> MasterDataItem {
        MasterDataItem {
            value: value.to_string(),
            display: display.to_string(),
            parent_type: parent.map(str::to_string),
        }
    }

    fn loaded_reconciler() -> Reconciler {
        let mut r = Reconciler::new(sections());
        r.load_section(
            vec![
                MasterDataCandidate::new("Widgit", Some("hardware".into())),
                MasterDataCandidate::new("Gizmo", Some("hardware".into())),
            ],
            vec![
                item("11", "Widget", Some("hardware")),
                item("12", "Gadget", Some("software")),
            ],
        )
        .unwrap();
        r
    }

    #[test]
    fn load_moves_section_to_presenting() {
        let r = loaded_reconciler();
        assert_eq!(r.phase(), &SectionPhase::Presenting);
        assert_eq!(r.visible_candidates().len(), 2);
    }

    #[test]
    fn master_list_is_scoped_to_candidate_type() {
        let r = loaded_reconciler();
        let scoped = r.master_items_for(&r.candidates()[0]);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].display, "Widget");
    }

    #[test]
    fn selecting_a_master_item_resolves_the_candidate() {
        let mut r = loaded_reconciler();
        let widget = item("11", "Widget", Some("hardware"));
        r.select_master(0, &widget).unwrap();

        let c = &r.candidates()[0];
        assert_eq!(c.updated_id.as_deref(), Some("11"));
        assert_eq!(c.updated_value.as_deref(), Some("Widget"));
        assert!(!c.is_new_insert);
    }

    #[test]
    fn switching_type_clears_the_prior_match() {
        let mut r = loaded_reconciler();
        let widget = item("11", "Widget", Some("hardware"));
        r.select_master(0, &widget).unwrap();
        r.switch_parent_type(0, "software").unwrap();

        let c = &r.candidates()[0];
        assert_eq!(c.parent_type.as_deref(), Some("software"));
        assert_eq!(c.updated_id, None);
        assert_eq!(c.updated_value, None);
        assert!(c.is_new_insert);
    }

    #[test]
    fn unselected_candidates_submit_with_the_new_insert_sentinel() {
        let mut r = loaded_reconciler();
        let batch = r.begin_submit().unwrap();
        assert_eq!(r.phase(), &SectionPhase::Confirming);
        assert_eq!(batch.len(), 2);
        for c in &batch {
            assert_eq!(c.updated_id.as_deref(), Some(NEW_INSERT_ID));
            assert_eq!(c.updated_value.as_deref(), Some(c.current_value.as_str()));
            assert!(c.is_new_insert);
        }
    }

    #[test]
    fn successful_submission_marks_the_submitted_subset() {
        let mut r = loaded_reconciler();
        // One candidate was marked in an earlier pass.
        r.mark_candidates(&[1]).unwrap();

        let batch = r.begin_submit().unwrap();
        assert_eq!(batch.len(), 1);
        r.complete_submit(true).unwrap();

        assert!(r.candidates()[0].is_marked);
        assert!(r.section_complete());
        assert_eq!(r.phase(), &SectionPhase::Submitted);
    }

    #[test]
    fn failed_submission_marks_nothing() {
        let mut r = loaded_reconciler();
        r.begin_submit().unwrap();
        r.complete_submit(false).unwrap();

        assert_eq!(r.phase(), &SectionPhase::Presenting);
        assert!(r.candidates().iter().all(|c| !c.is_marked));
    }

    #[test]
    fn marked_candidates_are_hidden_but_retained() {
        let mut r = loaded_reconciler();
        r.begin_submit().unwrap();
        r.complete_submit(true).unwrap();

        assert!(r.visible_candidates().is_empty());
        assert_eq!(r.candidates().len(), 2);
    }

    #[test]
    fn marking_is_terminal_for_the_pass() {
        let mut r = loaded_reconciler();
        r.begin_submit().unwrap();
        r.complete_submit(true).unwrap();

        // Submitted sections refuse further selection.
        let widget = item("11", "Widget", Some("hardware"));
        assert_matches!(r.select_master(0, &widget).unwrap_err(), CoreError::Conflict(_));
    }

    #[test]
    fn incomplete_section_cannot_advance() {
        let mut r = loaded_reconciler();
        assert_matches!(r.advance().unwrap_err(), CoreError::Conflict(_));
    }

    #[test]
    fn advance_walks_the_section_queue_then_finishes() {
        let mut r = loaded_reconciler();
        r.begin_submit().unwrap();
        r.complete_submit(true).unwrap();

        let progress = r.advance().unwrap();
        assert_eq!(
            progress,
            ReconcileProgress::NextSection(Section {
                column_name: "company".into(),
                parent_type: None,
                alias_name: "Company".into(),
            })
        );
        assert_eq!(r.phase(), &SectionPhase::Loading);

        // Second section: one candidate, resolved against master.
        r.load_section(
            vec![MasterDataCandidate::new("Acme Inc", None)],
            vec![item("7", "Acme Incorporated", None)],
        )
        .unwrap();
        let acme = item("7", "Acme Incorporated", None);
        r.select_master(0, &acme).unwrap();
        let batch = r.begin_submit().unwrap();
        assert!(!batch[0].is_new_insert);
        assert_eq!(batch[0].updated_id.as_deref(), Some("7"));
        r.complete_submit(true).unwrap();

        assert_eq!(r.advance().unwrap(), ReconcileProgress::Finished);
    }

    #[test]
    fn submit_with_everything_marked_is_refused() {
        let mut r = loaded_reconciler();
        r.mark_candidates(&[0, 1]).unwrap();
        assert_matches!(r.begin_submit().unwrap_err(), CoreError::Conflict(_));
    }
}
