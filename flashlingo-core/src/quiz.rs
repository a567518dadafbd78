//! Typed-answer quiz over a shuffled, topic-filtered deck.
//!
//! A session is built from a snapshot of entries and never sees later
//! repository changes. Each question goes through submit then advance; the
//! last advance finishes the session and produces a [`QuizReport`].

use crate::{filter_by_topic, Direction, SessionError, TopicFilter, VocabEntry};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of the active question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    #[default]
    None,
    Correct,
    Incorrect,
}

/// Result of a scored submission. An incorrect answer reveals the expected text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect { expected: String },
}

impl AnswerOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, AnswerOutcome::Correct)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizReport {
    pub score: usize,
    pub total: usize,
}

impl QuizReport {
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.score as f32 / self.total as f32
        }
    }
}

/// What `advance` moved the session to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Next,
    Finished(QuizReport),
}

/// The active question, projected from the queue and the session direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Question<'a> {
    /// One-based.
    pub number: usize,
    pub total: usize,
    pub prompt: &'a str,
    pub expected: &'a str,
    pub entry: &'a VocabEntry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Active,
    Finished,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
    topic: TopicFilter,
    direction: Direction,
    queue: Vec<VocabEntry>,
    cursor: usize,
    score: usize,
    pending_answer: String,
    last_outcome: Feedback,
    phase: Phase,
}

/// Case-folds and trims; answers compare equal only after this.
pub fn normalize_answer(s: &str) -> String {
    s.to_lowercase().trim().to_string()
}

impl QuizSession {
    pub fn start(
        entries: &[VocabEntry],
        topic: TopicFilter,
        direction: Direction,
    ) -> Result<Self, SessionError> {
        Self::start_with_rng(entries, topic, direction, &mut rand::rng())
    }

    /// Same as [`QuizSession::start`] with a caller-supplied RNG, so tests can seed it.
    pub fn start_with_rng<R: Rng + ?Sized>(
        entries: &[VocabEntry],
        topic: TopicFilter,
        direction: Direction,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let mut queue = filter_by_topic(entries, &topic);
        if queue.is_empty() {
            return Err(SessionError::EmptyDeck {
                topic: topic.label().to_string(),
            });
        }
        queue.shuffle(rng);
        trace!(topic = %topic, ?direction, len = queue.len(), "quiz session started");
        Ok(Self {
            topic,
            direction,
            queue,
            cursor: 0,
            score: 0,
            pending_answer: String::new(),
            last_outcome: Feedback::None,
            phase: Phase::Active,
        })
    }

    pub fn topic(&self) -> &TopicFilter {
        &self.topic
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn queue(&self) -> &[VocabEntry] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.queue.len()
    }

    pub fn last_outcome(&self) -> Feedback {
        self.last_outcome
    }

    pub fn pending_answer(&self) -> &str {
        &self.pending_answer
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn is_last_question(&self) -> bool {
        self.cursor + 1 >= self.queue.len()
    }

    /// `None` once finished.
    pub fn question(&self) -> Option<Question<'_>> {
        if self.is_finished() {
            return None;
        }
        let entry = self.queue.get(self.cursor)?;
        Some(Question {
            number: self.cursor + 1,
            total: self.queue.len(),
            prompt: self.direction.prompt(entry),
            expected: self.direction.expected(entry),
            entry,
        })
    }

    /// The expected answer, but only after an incorrect submission.
    pub fn revealed_answer(&self) -> Option<&str> {
        if self.last_outcome != Feedback::Incorrect {
            return None;
        }
        self.question().map(|q| q.expected)
    }

    /// Share of the queue already resolved, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.is_finished() {
            return 1.0;
        }
        let resolved = self.cursor + usize::from(self.last_outcome != Feedback::None);
        resolved as f32 / self.queue.len() as f32
    }

    pub fn report(&self) -> Option<QuizReport> {
        self.is_finished().then(|| QuizReport {
            score: self.score,
            total: self.queue.len(),
        })
    }

    /// Updates the unsubmitted input for the active question.
    pub fn set_pending_answer(&mut self, input: impl Into<String>) -> Result<(), SessionError> {
        self.require_unresolved()?;
        self.pending_answer = input.into();
        Ok(())
    }

    pub fn submit_pending(&mut self) -> Result<Option<AnswerOutcome>, SessionError> {
        let input = self.pending_answer.clone();
        self.submit_answer(&input)
    }

    /// Scores `input` against the active question.
    ///
    /// Blank input is ignored and returns `Ok(None)` without touching state.
    /// A second submission for the same question is a precondition violation.
    pub fn submit_answer(&mut self, input: &str) -> Result<Option<AnswerOutcome>, SessionError> {
        self.require_unresolved()?;
        if input.trim().is_empty() {
            return Ok(None);
        }
        let entry = &self.queue[self.cursor];
        let expected = self.direction.expected(entry);
        self.pending_answer = input.to_string();

        let outcome = if normalize_answer(input) == normalize_answer(expected) {
            self.score += 1;
            self.last_outcome = Feedback::Correct;
            AnswerOutcome::Correct
        } else {
            self.last_outcome = Feedback::Incorrect;
            AnswerOutcome::Incorrect {
                expected: expected.to_string(),
            }
        };
        trace!(
            cursor = self.cursor,
            correct = outcome.is_correct(),
            score = self.score,
            "answer scored"
        );
        Ok(Some(outcome))
    }

    /// Moves past a resolved question, finishing after the last one.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        if self.is_finished() {
            return Err(SessionError::PreconditionViolation("session already finished"));
        }
        if self.last_outcome == Feedback::None {
            return Err(SessionError::PreconditionViolation("advance before answering"));
        }
        self.last_outcome = Feedback::None;
        self.pending_answer.clear();

        if self.cursor + 1 < self.queue.len() {
            self.cursor += 1;
            Ok(Advance::Next)
        } else {
            self.phase = Phase::Finished;
            let report = QuizReport {
                score: self.score,
                total: self.queue.len(),
            };
            trace!(score = report.score, total = report.total, "quiz session finished");
            Ok(Advance::Finished(report))
        }
    }

    fn require_unresolved(&self) -> Result<(), SessionError> {
        if self.is_finished() {
            Err(SessionError::PreconditionViolation("session already finished"))
        } else if self.last_outcome != Feedback::None {
            Err(SessionError::PreconditionViolation("answer already submitted"))
        } else {
            Ok(())
        }
    }
}
