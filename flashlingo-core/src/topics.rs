use crate::VocabEntry;
use std::collections::{BTreeMap, BTreeSet};

/// Distinct normalized topics, ascending. The "all" pseudo-topic is implicit
/// and never part of the set.
pub fn compute_topics(entries: &[VocabEntry]) -> BTreeSet<String> {
    entries.iter().map(VocabEntry::normalized_topic).collect()
}

/// Entry count per normalized topic, keyed in the same order as [`compute_topics`].
pub fn topic_counts(entries: &[VocabEntry]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for e in entries {
        *counts.entry(e.normalized_topic()).or_insert(0) += 1;
    }
    counts
}
