//! WebSocket upgrade + lesson loop. Each connection plays at most one lesson at a time.
//!
//! Client messages are parsed as JSON and forwarded to the connection's lesson
//! session; the reply carries the resulting snapshot. Changes that happen on their
//! own (feedback clearing, the move to the replace phase, an explanation arriving)
//! are pushed as extra `lesson` messages.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::watch;
use tracing::{info, error, instrument, debug};

use crate::engine::LessonSnapshot;
use crate::error::SessionError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::lesson_message;
use crate::session::SessionHandle;
use crate::state::AppState;

/// Per-connection lesson slot.
#[derive(Default)]
struct Conn {
  lesson: Option<SessionHandle>,
  updates: Option<watch::Receiver<LessonSnapshot>>,
}

impl Conn {
  fn attach(&mut self, handle: SessionHandle) {
    let mut rx = handle.subscribe();
    rx.borrow_and_update();
    self.updates = Some(rx);
    self.lesson = Some(handle);
  }

  fn detach(&mut self) {
    self.lesson = None;
    self.updates = None;
  }

  // The reply already carries this state; don't push it twice. A newer value
  // published after the reply must still be pushed.
  fn mark_seen(&mut self, reply: &LessonSnapshot) {
    if let Some(rx) = self.updates.as_mut() {
      if *rx.borrow() == *reply {
        rx.borrow_and_update();
      }
    }
  }
}

enum Event {
  Incoming(Option<Result<Message, axum::Error>>),
  Update(Option<LessonSnapshot>),
}

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "paqij_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "paqij_backend", "WebSocket connected");
  let mut conn = Conn::default();

  loop {
    let event = tokio::select! {
      incoming = socket.recv() => Event::Incoming(incoming),
      update = next_update(&mut conn.updates) => Event::Update(update),
    };

    let reply_msg = match event {
      Event::Incoming(Some(Ok(Message::Text(txt)))) => {
        match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "paqij_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut conn).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        }
      }
      Event::Incoming(Some(Ok(Message::Ping(payload)))) => {
        let _ = socket.send(Message::Pong(payload)).await;
        continue;
      }
      Event::Incoming(Some(Ok(Message::Close(_)))) | Event::Incoming(None) => break,
      Event::Incoming(Some(Err(e))) => {
        error!(target: "paqij_backend", error = %e, "WS receive error");
        break;
      }
      Event::Incoming(Some(Ok(_))) => continue,
      Event::Update(Some(snapshot)) => lesson_message(&state, snapshot),
      Event::Update(None) => {
        conn.updates = None;
        continue;
      }
    };

    let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });

    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "paqij_backend", error = %e, "WS send error");
      break;
    }
  }

  // Dropping the handle ends the session task and its pending lookups.
  conn.detach();
  info!(target: "paqij_backend", "WebSocket disconnected");
}

/// Resolves with the next pushed snapshot, `None` once the session is gone, never without a session.
async fn next_update(updates: &mut Option<watch::Receiver<LessonSnapshot>>) -> Option<LessonSnapshot> {
  match updates {
    Some(rx) => match rx.changed().await {
      Ok(()) => Some(rx.borrow_and_update().clone()),
      Err(_) => None,
    },
    None => std::future::pending().await,
  }
}

#[instrument(level = "info", skip(state, conn))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, conn: &mut Conn) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartLesson => {
      conn.detach();
      match state.start_lesson() {
        Ok(handle) => {
          let snapshot = handle.snapshot();
          tracing::info!(target: "lesson", session = %handle.id, "WS lesson started");
          conn.attach(handle);
          lesson_message(state, snapshot)
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Identify { token } => {
      let Some(handle) = conn.lesson.as_ref() else { return no_lesson() };
      let result = handle.attempt_identify(token).await;
      after_command(result, state, conn).await
    }

    ClientWsMessage::Replace { option } => {
      let Some(handle) = conn.lesson.as_ref() else { return no_lesson() };
      let result = handle.attempt_replace(option).await;
      after_command(result, state, conn).await
    }

    ClientWsMessage::Advance => {
      let Some(handle) = conn.lesson.as_ref() else { return no_lesson() };
      let result = handle.advance().await;
      after_command(result, state, conn).await
    }

    ClientWsMessage::Cancel => {
      let Some(handle) = conn.lesson.as_ref() else { return no_lesson() };
      let result = handle.cancel().await;
      conn.detach();
      match result {
        Ok(_) | Err(SessionError::Closed) => {
          tracing::info!(target: "lesson", "WS lesson cancelled");
          ServerWsMessage::Cancelled
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
  }
}

async fn after_command(
  result: Result<LessonSnapshot, SessionError>,
  state: &AppState,
  conn: &mut Conn,
) -> ServerWsMessage {
  match result {
    Ok(snapshot) => {
      conn.mark_seen(&snapshot);
      match snapshot.final_score {
        Some(score) => {
          conn.detach();
          let progress = state.record_completion(score).await;
          tracing::info!(target: "lesson", score, "WS lesson complete");
          ServerWsMessage::Complete { score, progress }
        }
        None => lesson_message(state, snapshot),
      }
    }
    Err(SessionError::Closed) => {
      conn.detach();
      ServerWsMessage::Error { message: SessionError::Closed.to_string() }
    }
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

fn no_lesson() -> ServerWsMessage {
  ServerWsMessage::Error { message: "No lesson in progress; send start_lesson first.".into() }
}
