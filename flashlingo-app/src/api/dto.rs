use chrono::{DateTime, Utc};
use flashlingo_core::{EntryId, VocabEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryOut {
    pub id: EntryId,
    pub source_text: String,
    pub target_text: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub mastered: bool,
}

impl From<&VocabEntry> for EntryOut {
    fn from(e: &VocabEntry) -> Self {
        Self {
            id: e.id,
            source_text: e.source_text.clone(),
            target_text: e.target_text.clone(),
            topic: e.topic.clone(),
            created_at: e.created_at,
            mastered: e.mastered,
        }
    }
}

pub fn entries_out(entries: &[VocabEntry]) -> Vec<EntryOut> {
    entries.iter().map(EntryOut::from).collect()
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub topic: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicOut {
    pub name: String,
    pub count: usize,
}

/// `all` is the size of the whole collection, listed ahead of the named topics.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicsOut {
    pub all: usize,
    pub topics: Vec<TopicOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
    pub detail: String,
}
