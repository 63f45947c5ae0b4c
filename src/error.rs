//! Error types for content loading, lesson misuse, and explanation lookups.
//!
//! Wrong answers are not errors; they surface as `Feedback::Incorrect` on the snapshot.

use crate::domain::Phase;

/// The deck cannot be used to run a lesson.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContentError {
  #[error("content store is empty: a lesson needs at least one word pair")]
  Empty,

  #[error("duplicate word pair id '{0}'")]
  DuplicateId(String),

  #[error("word pair '{id}': example_mixed does not contain the loanword '{dirty_word}' as a token")]
  LoanwordMissing { id: String, dirty_word: String },

  #[error("word pair '{id}': example_pure does not carry '{pure_word}' at token position {position}")]
  PureWordMisplaced { id: String, pure_word: String, position: usize },

  #[error("word pair '{id}': usage_notes is blank, so a failed explanation would leave nothing to show")]
  UsageNotesMissing { id: String },
}

/// An operation was invoked when the lesson could not accept it. State is left untouched.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum EngineError {
  #[error("'{op}' is not valid in phase {phase}")]
  WrongPhase { op: &'static str, phase: Phase },

  #[error("a transition is already scheduled; wait for it to land")]
  TransitionPending,

  #[error("the lesson is no longer active")]
  Inactive,
}

/// Any non-success outcome of an explanation lookup. All variants are treated the same by the engine.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LookupError {
  #[error("explanation service is not configured")]
  Unavailable,

  #[error("explanation service failed: {0}")]
  Service(String),

  /// Elapsed budget in milliseconds.
  #[error("explanation lookup timed out after {0}ms")]
  Timeout(u64),
}

/// A command could not be delivered to a lesson session.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SessionError {
  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("lesson session has ended")]
  Closed,
}
