use crate::{filter_by_topic, SessionError, TopicFilter, VocabEntry};
use tracing::trace;

/// Flip-card browser over a topic-filtered view of the collection.
///
/// Navigation is cyclic. An empty deck has no current card and rejects
/// navigation; callers show a guidance message instead.
#[derive(Clone, Debug, Default)]
pub struct ReviewDeck {
    topic: TopicFilter,
    cards: Vec<VocabEntry>,
    cursor: usize,
    flipped: bool,
}

impl ReviewDeck {
    pub fn new(entries: &[VocabEntry], topic: TopicFilter) -> Self {
        let cards = filter_by_topic(entries, &topic);
        trace!(topic = %topic, len = cards.len(), "review deck built");
        Self {
            topic,
            cards,
            cursor: 0,
            flipped: false,
        }
    }

    /// Rebuilds the deck for another topic (or a fresh snapshot), starting over.
    pub fn set_topic(&mut self, entries: &[VocabEntry], topic: TopicFilter) {
        *self = Self::new(entries, topic);
    }

    /// Re-filters against a newer snapshot under the same topic, staying on the
    /// current card if it still exists. Flip state is kept only in that case.
    pub fn refresh(&mut self, entries: &[VocabEntry]) {
        let current = self.current().map(|e| e.id);
        let flipped = self.flipped;
        self.cards = filter_by_topic(entries, &self.topic);
        match current.and_then(|id| self.cards.iter().position(|e| e.id == id)) {
            Some(pos) => {
                self.cursor = pos;
                self.flipped = flipped;
            }
            None => {
                self.cursor = self.cursor.min(self.cards.len().saturating_sub(1));
                self.flipped = false;
            }
        }
    }

    pub fn topic(&self) -> &TopicFilter {
        &self.topic
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn current(&self) -> Option<&VocabEntry> {
        self.cards.get(self.cursor)
    }

    /// One-based position and deck length, for "card 3 / 10" displays.
    pub fn position(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            None
        } else {
            Some((self.cursor + 1, self.cards.len()))
        }
    }

    pub fn next(&mut self) -> Result<(), SessionError> {
        let len = self.require_cards("next on empty deck")?;
        self.cursor = (self.cursor + 1) % len;
        self.flipped = false;
        Ok(())
    }

    pub fn prev(&mut self) -> Result<(), SessionError> {
        let len = self.require_cards("prev on empty deck")?;
        self.cursor = (self.cursor + len - 1) % len;
        self.flipped = false;
        Ok(())
    }

    pub fn toggle_flip(&mut self) -> Result<(), SessionError> {
        self.require_cards("flip on empty deck")?;
        self.flipped = !self.flipped;
        Ok(())
    }

    fn require_cards(&self, what: &'static str) -> Result<usize, SessionError> {
        if self.cards.is_empty() {
            Err(SessionError::PreconditionViolation(what))
        } else {
            Ok(self.cards.len())
        }
    }
}
