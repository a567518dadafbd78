use thiserror::Error;

/// Failures surfaced by a [`crate::VocabRepository`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("storage error: {0}")]
    Storage(&'static str),
}

/// Failures of the review deck and quiz session state machines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The topic filter matched no entries; pick another topic.
    #[error("no entries for topic {topic:?}")]
    EmptyDeck { topic: String },
    /// The call is not valid in the current state.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),
}
