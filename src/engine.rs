//! Lesson progression engine: the per-item identify -> replace -> reinforce loop.
//!
//! The engine performs no IO and never sleeps. Operations mutate the session and
//! return `Effect`s that the driver (see `session`) must carry out:
//!   - `Schedule`: fire `on_timer(token)` after a delay (success highlight, feedback clear)
//!   - `Lookup`: fetch an explanation and hand it back through `on_explanation`
//!   - `Finished`: the lesson is over; report the score
//!
//! Timer tokens and lookup tickets make late deliveries harmless: anything that
//! does not match what the engine is currently waiting for is dropped.

use std::time::Duration;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use tracing::{debug, warn};

use crate::content::ContentStore;
use crate::domain::{Feedback, Phase, WordPair};
use crate::error::{ContentError, EngineError, LookupError};
use crate::util::token_matches;

pub const IDENTIFY_REWARD: u32 = 5;
pub const REPLACE_REWARD: u32 = 10;
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(800);
const MAX_DISTRACTORS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// Identity of the item a lookup was issued for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTicket {
  pub item_index: usize,
  pub item_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupRequest {
  pub ticket: LookupTicket,
  pub dirty_word: String,
  pub pure_word: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
  Schedule { token: TimerToken, after: Duration },
  Lookup(LookupRequest),
  Finished { score: u32 },
}

/// Read-only view handed to the presentation layer.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonSnapshot {
  pub phase: Phase,
  pub current_index: usize,
  pub total: usize,
  pub score: u32,
  pub options: Vec<String>,
  /// `None` while the lookup is outstanding; the client shows a loading placeholder.
  pub explanation: Option<String>,
  pub feedback: Option<Feedback>,
  pub final_score: Option<u32>,
  pub abandoned: bool,
}

pub struct LessonEngine {
  store: ContentStore,
  feedback_delay: Duration,
  rng: StdRng,

  current_index: usize,
  phase: Phase,
  score: u32,
  options: Vec<String>,
  explanation: Option<String>,
  feedback: Option<Feedback>,
  final_score: Option<u32>,
  abandoned: bool,

  next_token: u64,
  pending_transition: Option<TimerToken>,
  feedback_clear: Option<TimerToken>,
  pending_lookup: Option<LookupTicket>,
}

impl LessonEngine {
  pub fn new(store: ContentStore, feedback_delay: Duration) -> Result<Self, ContentError> {
    Self::with_rng(store, feedback_delay, StdRng::from_entropy())
  }

  /// Deterministic option shuffling.
  #[cfg(test)]
  pub fn with_seed(store: ContentStore, feedback_delay: Duration, seed: u64) -> Result<Self, ContentError> {
    Self::with_rng(store, feedback_delay, StdRng::seed_from_u64(seed))
  }

  fn with_rng(store: ContentStore, feedback_delay: Duration, rng: StdRng) -> Result<Self, ContentError> {
    if store.get(0).is_none() {
      return Err(ContentError::Empty);
    }
    Ok(Self {
      store,
      feedback_delay,
      rng,
      current_index: 0,
      phase: Phase::Identify,
      score: 0,
      options: Vec::new(),
      explanation: None,
      feedback: None,
      final_score: None,
      abandoned: false,
      next_token: 0,
      pending_transition: None,
      feedback_clear: None,
      pending_lookup: None,
    })
  }

  pub fn snapshot(&self) -> LessonSnapshot {
    LessonSnapshot {
      phase: self.phase,
      current_index: self.current_index,
      total: self.store.len(),
      score: self.score,
      options: self.options.clone(),
      explanation: self.explanation.clone(),
      feedback: self.feedback,
      final_score: self.final_score,
      abandoned: self.abandoned,
    }
  }

  pub fn current_word(&self) -> &WordPair { &self.store[self.current_index] }

  pub fn phase(&self) -> Phase { self.phase }

  pub fn score(&self) -> u32 { self.score }

  /// Completed or abandoned; no further operation is accepted.
  pub fn is_over(&self) -> bool { self.abandoned || self.phase == Phase::Complete }

  pub fn attempt_identify(&mut self, token: &str) -> Result<Vec<Effect>, EngineError> {
    self.ensure_phase("attempt_identify", Phase::Identify)?;
    if self.pending_transition.is_some() {
      return Err(EngineError::TransitionPending);
    }

    let word = self.current_word();
    if token_matches(token, &word.dirty_word) {
      debug!(target: "lesson", index = self.current_index, id = %word.id, "loanword identified");
      self.score += IDENTIFY_REWARD;
      self.feedback = Some(Feedback::Correct);
      self.feedback_clear = None;
      let token = self.mint_token();
      self.pending_transition = Some(token);
      Ok(vec![Effect::Schedule { token, after: self.feedback_delay }])
    } else {
      Ok(vec![self.flash_incorrect()])
    }
  }

  pub fn attempt_replace(&mut self, option: &str) -> Result<Vec<Effect>, EngineError> {
    self.ensure_phase("attempt_replace", Phase::Replace)?;

    if option == self.current_word().pure_word {
      debug!(target: "lesson", index = self.current_index, "pure word chosen");
      self.score += REPLACE_REWARD;
      self.feedback = Some(Feedback::Correct);
      self.feedback_clear = None;
      Ok(vec![self.enter_reinforce()])
    } else {
      Ok(vec![self.flash_incorrect()])
    }
  }

  pub fn advance(&mut self) -> Result<Vec<Effect>, EngineError> {
    self.ensure_phase("advance", Phase::Reinforce)?;
    self.pending_lookup = None;
    self.feedback_clear = None;
    self.feedback = None;

    if self.store.is_last(self.current_index) {
      self.phase = Phase::Complete;
      self.final_score = Some(self.score);
      debug!(target: "lesson", score = self.score, "lesson complete");
      return Ok(vec![Effect::Finished { score: self.score }]);
    }

    self.current_index += 1;
    self.phase = Phase::Identify;
    self.explanation = None;
    self.options.clear();
    debug!(target: "lesson", index = self.current_index, "next item");
    Ok(Vec::new())
  }

  /// Abandon the lesson. Pending timers and lookups become stale.
  pub fn cancel(&mut self) -> Result<(), EngineError> {
    if self.is_over() {
      return Err(EngineError::Inactive);
    }
    self.abandoned = true;
    self.pending_transition = None;
    self.feedback_clear = None;
    self.pending_lookup = None;
    debug!(target: "lesson", index = self.current_index, score = self.score, "lesson cancelled");
    Ok(())
  }

  /// Deliver a scheduled timer. Returns true if the snapshot changed.
  pub fn on_timer(&mut self, token: TimerToken) -> bool {
    if self.is_over() {
      return false;
    }
    if self.pending_transition == Some(token) {
      self.pending_transition = None;
      self.feedback_clear = None;
      self.feedback = None;
      self.enter_replace();
      return true;
    }
    if self.feedback_clear == Some(token) {
      self.feedback_clear = None;
      self.feedback = None;
      return true;
    }
    false
  }

  /// Deliver an explanation lookup result. Returns true if it was applied.
  pub fn on_explanation(&mut self, ticket: &LookupTicket, result: Result<String, LookupError>) -> bool {
    if self.is_over() || self.pending_lookup.as_ref() != Some(ticket) {
      debug!(target: "lesson", index = ticket.item_index, item = %ticket.item_id, "discarding stale explanation");
      return false;
    }
    self.pending_lookup = None;

    let text = match result {
      Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
      Ok(_) => {
        warn!(target: "lesson", item = %ticket.item_id, "empty explanation; using usage notes");
        self.current_word().usage_notes.clone()
      }
      Err(e) => {
        warn!(target: "lesson", item = %ticket.item_id, error = %e, "explanation lookup failed; using usage notes");
        self.current_word().usage_notes.clone()
      }
    };
    self.explanation = Some(text);
    true
  }

  fn ensure_phase(&self, op: &'static str, expected: Phase) -> Result<(), EngineError> {
    if self.is_over() {
      return Err(EngineError::Inactive);
    }
    if self.phase != expected {
      return Err(EngineError::WrongPhase { op, phase: self.phase });
    }
    Ok(())
  }

  fn mint_token(&mut self) -> TimerToken {
    self.next_token += 1;
    TimerToken(self.next_token)
  }

  // Later feedback replaces the pending clear, so an old timer cannot wipe it early.
  fn flash_incorrect(&mut self) -> Effect {
    self.feedback = Some(Feedback::Incorrect);
    let token = self.mint_token();
    self.feedback_clear = Some(token);
    Effect::Schedule { token, after: self.feedback_delay }
  }

  fn enter_replace(&mut self) {
    let index = self.current_index;
    let answer = self.store[index].pure_word.clone();

    // First distractors in deck order; only the final arrangement is random.
    let mut options: Vec<String> = self
      .store
      .iter()
      .enumerate()
      .filter(|(i, wp)| *i != index && wp.pure_word != answer)
      .map(|(_, wp)| wp.pure_word.clone())
      .take(MAX_DISTRACTORS)
      .collect();
    options.push(answer);
    options.shuffle(&mut self.rng);

    self.options = options;
    self.phase = Phase::Replace;
  }

  fn enter_reinforce(&mut self) -> Effect {
    let word = self.current_word();
    let ticket = LookupTicket { item_index: self.current_index, item_id: word.id.clone() };
    let request = LookupRequest {
      ticket: ticket.clone(),
      dirty_word: word.dirty_word.clone(),
      pure_word: word.pure_word.clone(),
    };
    self.phase = Phase::Reinforce;
    self.explanation = None;
    self.pending_lookup = Some(ticket);
    Effect::Lookup(request)
  }
}
