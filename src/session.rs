//! Lesson session driver: one tokio task per play-through, owning a `LessonEngine`.
//!
//! Commands arrive over an mpsc channel and are answered with the post-command
//! snapshot. Effects requested by the engine run as spawned tasks (sleeps and
//! explanation lookups) whose results re-enter the same task, so the engine is
//! only ever touched from one place. Every change is also published on a watch
//! channel for clients that render asynchronously.
//!
//! The task exits once the lesson is completed or cancelled, or when the handle
//! is dropped; outstanding timers and lookups are aborted on exit.

use std::{sync::Arc, time::Duration};

use tokio::{
  sync::{mpsc, oneshot, watch},
  task::AbortHandle,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::engine::{Effect, LessonEngine, LessonSnapshot, LookupRequest, LookupTicket, TimerToken};
use crate::error::{EngineError, LookupError, SessionError};
use crate::explain::ExplanationLookup;

const COMMAND_BUFFER: usize = 16;

type Reply = oneshot::Sender<Result<LessonSnapshot, EngineError>>;

enum Command {
  Identify { token: String, reply: Reply },
  Replace { option: String, reply: Reply },
  Advance { reply: Reply },
  Cancel { reply: Reply },
}

enum Internal {
  Timer(TimerToken),
  Explained(LookupTicket, Result<String, LookupError>),
}

/// Client side of a running lesson.
pub struct SessionHandle {
  pub id: Uuid,
  commands: mpsc::Sender<Command>,
  snapshots: watch::Receiver<LessonSnapshot>,
}

impl SessionHandle {
  /// Spawn the session task. Must be called inside a tokio runtime.
  pub fn start(engine: LessonEngine, lookup: Arc<dyn ExplanationLookup>, lookup_timeout: Duration) -> Self {
    let id = Uuid::new_v4();
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();
    let (snap_tx, snap_rx) = watch::channel(engine.snapshot());

    let actor = Actor {
      id,
      engine,
      lookup,
      lookup_timeout,
      internal_tx,
      snapshots: snap_tx,
      tasks: Vec::new(),
    };
    tokio::spawn(actor.run(cmd_rx, internal_rx));
    info!(target: "lesson", session = %id, "lesson session started");

    Self { id, commands: cmd_tx, snapshots: snap_rx }
  }

  pub async fn attempt_identify(&self, token: impl Into<String>) -> Result<LessonSnapshot, SessionError> {
    let token = token.into();
    self.request(|reply| Command::Identify { token, reply }).await
  }

  pub async fn attempt_replace(&self, option: impl Into<String>) -> Result<LessonSnapshot, SessionError> {
    let option = option.into();
    self.request(|reply| Command::Replace { option, reply }).await
  }

  pub async fn advance(&self) -> Result<LessonSnapshot, SessionError> {
    self.request(|reply| Command::Advance { reply }).await
  }

  pub async fn cancel(&self) -> Result<LessonSnapshot, SessionError> {
    self.request(|reply| Command::Cancel { reply }).await
  }

  /// Latest published state.
  pub fn snapshot(&self) -> LessonSnapshot { self.snapshots.borrow().clone() }

  /// Receiver that wakes on every published change.
  pub fn subscribe(&self) -> watch::Receiver<LessonSnapshot> { self.snapshots.clone() }

  async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<LessonSnapshot, SessionError> {
    let (tx, rx) = oneshot::channel();
    self.commands.send(make(tx)).await.map_err(|_| SessionError::Closed)?;
    let result = rx.await.map_err(|_| SessionError::Closed)?;
    Ok(result?)
  }
}

struct Actor {
  id: Uuid,
  engine: LessonEngine,
  lookup: Arc<dyn ExplanationLookup>,
  lookup_timeout: Duration,
  internal_tx: mpsc::UnboundedSender<Internal>,
  snapshots: watch::Sender<LessonSnapshot>,
  tasks: Vec<AbortHandle>,
}

impl Actor {
  #[instrument(level = "debug", skip_all, fields(session = %self.id))]
  async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut internal: mpsc::UnboundedReceiver<Internal>) {
    loop {
      tokio::select! {
        cmd = commands.recv() => match cmd {
          Some(cmd) => self.handle_command(cmd),
          None => {
            debug!(target: "lesson", "session handle dropped");
            break;
          }
        },
        Some(ev) = internal.recv() => self.handle_internal(ev),
      }
      if self.engine.is_over() {
        break;
      }
    }

    for task in self.tasks.drain(..) {
      task.abort();
    }
    info!(target: "lesson", phase = %self.engine.phase(), score = self.engine.score(), "lesson session closed");
  }

  fn handle_command(&mut self, cmd: Command) {
    let (result, reply) = match cmd {
      Command::Identify { token, reply } => (self.engine.attempt_identify(&token), reply),
      Command::Replace { option, reply } => (self.engine.attempt_replace(&option), reply),
      Command::Advance { reply } => (self.engine.advance(), reply),
      Command::Cancel { reply } => (self.engine.cancel().map(|()| Vec::new()), reply),
    };
    let outcome = match result {
      Ok(effects) => {
        self.run_effects(effects);
        Ok(self.publish())
      }
      Err(e) => {
        debug!(target: "lesson", error = %e, "command rejected");
        Err(e)
      }
    };
    // Receiver may have given up waiting.
    let _ = reply.send(outcome);
  }

  fn handle_internal(&mut self, ev: Internal) {
    let changed = match ev {
      Internal::Timer(token) => self.engine.on_timer(token),
      Internal::Explained(ticket, result) => self.engine.on_explanation(&ticket, result),
    };
    if changed {
      self.publish();
    }
  }

  fn publish(&self) -> LessonSnapshot {
    let snap = self.engine.snapshot();
    self.snapshots.send_replace(snap.clone());
    snap
  }

  fn run_effects(&mut self, effects: Vec<Effect>) {
    for effect in effects {
      match effect {
        Effect::Schedule { token, after } => {
          let tx = self.internal_tx.clone();
          let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(Internal::Timer(token));
          });
          self.track(handle.abort_handle());
        }
        Effect::Lookup(req) => self.spawn_lookup(req),
        Effect::Finished { score } => {
          info!(target: "lesson", session = %self.id, score, "lesson finished");
        }
      }
    }
  }

  fn spawn_lookup(&mut self, req: LookupRequest) {
    let tx = self.internal_tx.clone();
    let lookup = self.lookup.clone();
    let timeout = self.lookup_timeout;
    debug!(target: "lesson", item = %req.ticket.item_id, "explanation lookup issued");

    let handle = tokio::spawn(async move {
      let result = match tokio::time::timeout(timeout, lookup.explain(&req.dirty_word, &req.pure_word)).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout(timeout.as_millis() as u64)),
      };
      let _ = tx.send(Internal::Explained(req.ticket, result));
    });
    self.track(handle.abort_handle());
  }

  fn track(&mut self, handle: AbortHandle) {
    self.tasks.retain(|h| !h.is_finished());
    self.tasks.push(handle);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::{fixtures::word, ContentStore};
  use crate::domain::{Feedback, Phase};
  use crate::engine::DEFAULT_FEEDBACK_DELAY;
  use crate::explain::testing::{Fixed, Gated};
  use crate::explain::Unavailable;
  use tokio::sync::Notify;

  fn start(store: ContentStore, lookup: Arc<dyn ExplanationLookup>, timeout: Duration) -> SessionHandle {
    let engine = LessonEngine::with_seed(store, DEFAULT_FEEDBACK_DELAY, 3).unwrap();
    SessionHandle::start(engine, lookup, timeout)
  }

  fn two_words() -> ContentStore {
    ContentStore::new(vec![word("w0", "Dirty0", "Pure0"), word("w1", "Dirty1", "Pure1")]).unwrap()
  }

  async fn wait_for(handle: &SessionHandle, pred: impl FnMut(&LessonSnapshot) -> bool) -> LessonSnapshot {
    let mut rx = handle.subscribe();
    let snap = rx.wait_for(pred).await.unwrap().clone();
    snap
  }

  #[tokio::test(start_paused = true)]
  async fn full_builtin_lesson_without_model_scores_75() {
    let store = ContentStore::builtin().unwrap();
    let words: Vec<_> = store.iter().cloned().collect();
    let s = start(store, Arc::new(Unavailable), Duration::from_secs(20));

    for (i, wp) in words.iter().enumerate() {
      let snap = s.attempt_identify(wp.dirty_word.as_str()).await.unwrap();
      assert_eq!(snap.feedback, Some(Feedback::Correct));
      assert_eq!(snap.phase, Phase::Identify);

      let snap = wait_for(&s, |s| s.phase == Phase::Replace).await;
      assert!(snap.options.contains(&wp.pure_word));

      let snap = s.attempt_replace(wp.pure_word.as_str()).await.unwrap();
      assert_eq!(snap.phase, Phase::Reinforce);
      assert_eq!(snap.score, (i as u32 + 1) * 15);

      let snap = wait_for(&s, |s| s.explanation.is_some()).await;
      assert_eq!(snap.explanation.as_deref(), Some(wp.usage_notes.as_str()));

      let snap = s.advance().await.unwrap();
      if i + 1 < words.len() {
        assert_eq!(snap.current_index, i + 1);
        assert_eq!(snap.phase, Phase::Identify);
        assert_eq!(snap.explanation, None);
      } else {
        assert_eq!(snap.phase, Phase::Complete);
        assert_eq!(snap.final_score, Some(75));
      }
    }

    assert_eq!(s.attempt_identify("Lazim").await.unwrap_err(), SessionError::Closed);
  }

  #[tokio::test(start_paused = true)]
  async fn explanation_from_model_is_shown() {
    let lookup = Arc::new(Fixed { text: "Roots".into(), delay: Duration::from_secs(2) });
    let s = start(two_words(), lookup, Duration::from_secs(20));
    s.attempt_identify("Dirty0").await.unwrap();
    wait_for(&s, |s| s.phase == Phase::Replace).await;
    let snap = s.attempt_replace("Pure0").await.unwrap();
    assert_eq!(snap.explanation, None);
    let snap = wait_for(&s, |s| s.explanation.is_some()).await;
    assert_eq!(snap.explanation.as_deref(), Some("Roots (Dirty0 -> Pure0)"));
  }

  #[tokio::test(start_paused = true)]
  async fn slow_lookup_times_out_into_usage_notes() {
    let lookup = Arc::new(Fixed { text: "too late".into(), delay: Duration::from_secs(60) });
    let s = start(two_words(), lookup, Duration::from_secs(5));
    s.attempt_identify("Dirty0").await.unwrap();
    wait_for(&s, |s| s.phase == Phase::Replace).await;
    s.attempt_replace("Pure0").await.unwrap();
    let snap = wait_for(&s, |s| s.explanation.is_some()).await;
    assert_eq!(snap.explanation.as_deref(), Some("notes for w0"));
  }

  #[tokio::test(start_paused = true)]
  async fn wrong_answer_feedback_clears_after_delay() {
    let s = start(two_words(), Arc::new(Unavailable), Duration::from_secs(20));
    let snap = s.attempt_identify("e.").await.unwrap();
    assert_eq!(snap.feedback, Some(Feedback::Incorrect));
    let snap = wait_for(&s, |s| s.feedback.is_none()).await;
    assert_eq!(snap.phase, Phase::Identify);
    assert_eq!(snap.score, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn stale_lookup_does_not_leak_into_next_item() {
    let gate = Arc::new(Notify::new());
    let s = start(two_words(), Arc::new(Gated { gate: gate.clone() }), Duration::from_secs(600));

    s.attempt_identify("Dirty0").await.unwrap();
    wait_for(&s, |s| s.phase == Phase::Replace).await;
    s.attempt_replace("Pure0").await.unwrap();
    let snap = s.advance().await.unwrap();
    assert_eq!(snap.current_index, 1);

    gate.notify_waiters();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snap = s.snapshot();
    assert_eq!(snap.current_index, 1);
    assert_eq!(snap.phase, Phase::Identify);
    assert_eq!(snap.explanation, None);
  }

  #[tokio::test(start_paused = true)]
  async fn cancel_closes_the_session_without_score() {
    let gate = Arc::new(Notify::new());
    let s = start(two_words(), Arc::new(Gated { gate: gate.clone() }), Duration::from_secs(600));
    s.attempt_identify("Dirty0").await.unwrap();
    wait_for(&s, |s| s.phase == Phase::Replace).await;
    s.attempt_replace("Pure0").await.unwrap();

    let snap = s.cancel().await.unwrap();
    assert!(snap.abandoned);
    assert_eq!(snap.final_score, None);

    gate.notify_waiters();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(s.snapshot().explanation, None);
    assert_eq!(s.advance().await.unwrap_err(), SessionError::Closed);
  }

  #[tokio::test(start_paused = true)]
  async fn misuse_is_reported_and_session_keeps_running() {
    let s = start(two_words(), Arc::new(Unavailable), Duration::from_secs(20));
    let err = s.advance().await.unwrap_err();
    assert!(matches!(err, SessionError::Engine(EngineError::WrongPhase { op: "advance", .. })));
    let snap = s.attempt_identify("Dirty0").await.unwrap();
    assert_eq!(snap.score, 5);
  }
}
