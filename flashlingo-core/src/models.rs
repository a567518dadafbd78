use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

pub type EntryId = Uuid;

/// Topic label given to entries stored without one.
pub const UNCLASSIFIED_TOPIC: &str = "Unclassified";

/// Pseudo-topic meaning "no filter".
pub const ALL_TOPICS: &str = "all";

/// Owner of a vocabulary collection. Passed explicitly to every repository call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("user_id"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn local() -> Self {
        Self("local".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Maps an absent or blank topic to [`UNCLASSIFIED_TOPIC`]; otherwise trims it.
pub fn normalize_topic(topic: Option<&str>) -> String {
    match topic.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNCLASSIFIED_TOPIC.to_string(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabEntry {
    pub id: EntryId,
    pub source_text: String,
    pub target_text: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    /// Carried through storage; nothing in the quiz or deck reads it.
    #[serde(default)]
    pub mastered: bool,
}

impl VocabEntry {
    pub fn new(draft: ValidDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_text: draft.source_text,
            target_text: draft.target_text,
            topic: draft.topic,
            created_at: Utc::now(),
            mastered: false,
        }
    }

    /// Replaces the editable content, keeping identity and metadata.
    pub fn apply(&mut self, draft: ValidDraft) {
        self.source_text = draft.source_text;
        self.target_text = draft.target_text;
        self.topic = draft.topic;
    }

    /// The topic as the filters see it. Stored topics are already normalized,
    /// but snapshots imported from elsewhere may not be.
    pub fn normalized_topic(&self) -> String {
        normalize_topic(Some(&self.topic))
    }
}

/// User input for create/update, not yet validated.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryDraft {
    pub source_text: String,
    pub target_text: String,
    #[serde(default)]
    pub topic: Option<String>,
}

impl EntryDraft {
    pub fn new(
        source_text: impl Into<String>,
        target_text: impl Into<String>,
        topic: Option<&str>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            target_text: target_text.into(),
            topic: topic.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<ValidDraft, CoreError> {
        let source_text = self.source_text.trim();
        if source_text.is_empty() {
            return Err(CoreError::Validation("source_text"));
        }
        let target_text = self.target_text.trim();
        if target_text.is_empty() {
            return Err(CoreError::Validation("target_text"));
        }
        Ok(ValidDraft {
            source_text: source_text.to_string(),
            target_text: target_text.to_string(),
            topic: normalize_topic(self.topic.as_deref()),
        })
    }
}

/// Trimmed, non-empty texts and a normalized topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidDraft {
    pub source_text: String,
    pub target_text: String,
    pub topic: String,
}

/// Which subset of entries a deck or quiz works over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TopicFilter {
    #[default]
    All,
    Named(String),
}

impl TopicFilter {
    /// Only the exact word `all` (or nothing) means no filter, so a topic
    /// named "All" stays selectable.
    pub fn parse(raw: &str) -> Self {
        let t = raw.trim();
        if t.is_empty() || t == ALL_TOPICS {
            TopicFilter::All
        } else {
            TopicFilter::Named(t.to_string())
        }
    }

    pub fn matches(&self, entry: &VocabEntry) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Named(topic) => entry.normalized_topic() == *topic,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TopicFilter::All => ALL_TOPICS,
            TopicFilter::Named(topic) => topic,
        }
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for TopicFilter {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Which side of an entry is shown and which must be typed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    SourceToTarget,
    TargetToSource,
}

impl Direction {
    pub fn prompt<'a>(&self, entry: &'a VocabEntry) -> &'a str {
        match self {
            Direction::SourceToTarget => &entry.source_text,
            Direction::TargetToSource => &entry.target_text,
        }
    }

    pub fn expected<'a>(&self, entry: &'a VocabEntry) -> &'a str {
        match self {
            Direction::SourceToTarget => &entry.target_text,
            Direction::TargetToSource => &entry.source_text,
        }
    }

    pub fn prompt_label(&self) -> &'static str {
        match self {
            Direction::SourceToTarget => "source",
            Direction::TargetToSource => "target",
        }
    }

    pub fn answer_label(&self) -> &'static str {
        match self {
            Direction::SourceToTarget => "target",
            Direction::TargetToSource => "source",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            Direction::SourceToTarget => Direction::TargetToSource,
            Direction::TargetToSource => Direction::SourceToTarget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_trims_and_normalizes_topic() {
        let v = EntryDraft::new("  apple ", "táo ", Some("   "))
            .validate()
            .unwrap();
        assert_eq!(v.source_text, "apple");
        assert_eq!(v.target_text, "táo");
        assert_eq!(v.topic, UNCLASSIFIED_TOPIC);

        let v = EntryDraft::new("dog", "chó", Some(" Animals ")).validate().unwrap();
        assert_eq!(v.topic, "Animals");
    }

    #[test]
    fn draft_rejects_blank_texts() {
        assert_eq!(
            EntryDraft::new(" ", "x", None).validate(),
            Err(CoreError::Validation("source_text"))
        );
        assert_eq!(
            EntryDraft::new("x", "\t\n", None).validate(),
            Err(CoreError::Validation("target_text"))
        );
    }

    #[test]
    fn topic_filter_parsing() {
        assert_eq!(TopicFilter::parse("all"), TopicFilter::All);
        assert_eq!(TopicFilter::parse(" all "), TopicFilter::All);
        assert_eq!(TopicFilter::parse(""), TopicFilter::All);
        assert_eq!(TopicFilter::parse("All"), TopicFilter::Named("All".into()));
        assert_eq!(TopicFilter::parse(" ALL "), TopicFilter::Named("ALL".into()));
        assert_eq!(
            TopicFilter::parse(" Fruits "),
            TopicFilter::Named("Fruits".into())
        );
    }

    #[test]
    fn direction_projections() {
        let e = VocabEntry::new(EntryDraft::new("apple", "táo", None).validate().unwrap());
        assert_eq!(Direction::SourceToTarget.prompt(&e), "apple");
        assert_eq!(Direction::SourceToTarget.expected(&e), "táo");
        assert_eq!(Direction::TargetToSource.prompt(&e), "táo");
        assert_eq!(Direction::TargetToSource.expected(&e), "apple");
        assert_eq!(Direction::SourceToTarget.reversed(), Direction::TargetToSource);
    }

    #[test]
    fn user_id_rejects_blank() {
        assert!(UserId::new("  ").is_err());
        assert_eq!(UserId::new(" alice ").unwrap().as_str(), "alice");
    }

    #[test]
    fn entries_without_mastered_flag_still_load() {
        let raw = r#"{
            "id": "6f1c1b7e-8a2b-4c1d-9a53-0c2f3f4b5a61",
            "source_text": "dog",
            "target_text": "chó",
            "topic": "Animals",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let e: VocabEntry = serde_json::from_str(raw).unwrap();
        assert!(!e.mastered);
        assert_eq!(e.normalized_topic(), "Animals");
    }
}
