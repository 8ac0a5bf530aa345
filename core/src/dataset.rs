//! Subject data sources: the read-only seam to the ingestion layer.
//!
//! RULE: The engine never writes through a data source.

use crate::{
    error::SignalResult,
    model::SubjectHistory,
    types::SubjectId,
};
use std::collections::HashMap;

pub trait SubjectDataSource {
    /// Full settled and pending history for `subject_id`.
    /// Unknown subjects yield an empty history, not an error.
    fn subject_history(&self, subject_id: &str) -> SignalResult<SubjectHistory>;

    /// Every known subject, sorted ascending.
    fn subject_ids(&self) -> SignalResult<Vec<SubjectId>>;
}

/// Histories held in memory. Used by tests and the JSON import path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    histories: HashMap<SubjectId, SubjectHistory>,
}

impl InMemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_histories(histories: impl IntoIterator<Item = SubjectHistory>) -> Self {
        let mut dataset = Self::new();
        for h in histories {
            dataset.insert(h);
        }
        dataset
    }

    /// Add or replace a subject's history.
    pub fn insert(&mut self, history: SubjectHistory) {
        self.histories.insert(history.subject_id.clone(), history);
    }

    pub fn history_mut(&mut self, subject_id: &str) -> Option<&mut SubjectHistory> {
        self.histories.get_mut(subject_id)
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

impl SubjectDataSource for InMemoryDataset {
    fn subject_history(&self, subject_id: &str) -> SignalResult<SubjectHistory> {
        Ok(self
            .histories
            .get(subject_id)
            .cloned()
            .unwrap_or_else(|| SubjectHistory::empty(subject_id)))
    }

    fn subject_ids(&self) -> SignalResult<Vec<SubjectId>> {
        let mut ids: Vec<SubjectId> = self.histories.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
