use std::collections::BTreeMap;

use crate::models::Photo;
use crate::upload::UploadState;

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Created(Photo),
    Failed(String),
    /// Never attempted, or interrupted by cancellation.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    outcomes: Vec<FileOutcome>,
    state: UploadState,
}

impl UploadReport {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            outcomes: vec![FileOutcome::Skipped; total],
            state: UploadState::Idle,
        }
    }

    pub(crate) fn record_created(&mut self, index: usize, photo: Photo) {
        self.outcomes[index] = FileOutcome::Created(photo);
    }

    pub(crate) fn record_failed(&mut self, index: usize, message: String) {
        self.outcomes[index] = FileOutcome::Failed(message);
    }

    pub(crate) fn finish(&mut self, state: UploadState) {
        self.state = state;
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// Error message per file index.
    pub fn errors(&self) -> BTreeMap<usize, String> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| match outcome {
                FileOutcome::Failed(message) => Some((index, message.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<&Photo> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FileOutcome::Created(photo) => Some(photo),
                _ => None,
            })
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.created().len()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, FileOutcome::Failed(_)))
            .count()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_success(&self) -> bool {
        self.state == UploadState::Completed
    }
}
