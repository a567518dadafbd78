use crate::{TopicFilter, VocabEntry};

pub fn filter_by_topic(entries: &[VocabEntry], filter: &TopicFilter) -> Vec<VocabEntry> {
    entries
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect()
}

pub fn filter_by_text(entries: &[VocabEntry], query: &str) -> Vec<VocabEntry> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return entries.to_vec();
    }
    entries
        .iter()
        .filter(|e| {
            e.source_text.to_lowercase().contains(&q)
                || e.target_text.to_lowercase().contains(&q)
                || e.topic.to_lowercase().contains(&q)
        })
        .cloned()
        .collect()
}

/// Newest first; equal timestamps fall back to id so snapshots are stable.
pub fn sort_newest_first(entries: &mut [VocabEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}
