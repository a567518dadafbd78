use crate::{topic_counts, VocabEntry};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub mastered: usize,
    pub topics: usize,
}

impl DashboardStats {
    pub fn from_entries(entries: &[VocabEntry]) -> Self {
        Self {
            total: entries.len(),
            mastered: entries.iter().filter(|e| e.mastered).count(),
            topics: topic_counts(entries).len(),
        }
    }
}
