//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument, warn};

use crate::protocol::*;
use crate::state::AppState;
use crate::logic::sentence_for_word;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_words(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let words: Vec<WordOut> = state.content.iter().map(to_out).collect();
  info!(target: "lesson", count = words.len(), "HTTP words served");
  Json(WordsOut { words })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.progress().await)
}

#[instrument(level = "info", skip(state, body), fields(word_id = %body.word_id))]
pub async fn http_post_sentence(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SentenceIn>,
) -> axum::response::Response {
  match sentence_for_word(&state, &body.word_id).await {
    Some(out) => {
      info!(target: "lesson", id = %body.word_id, source = out.source, "HTTP sentence served");
      Json(out).into_response()
    }
    None => {
      warn!(target: "lesson", id = %body.word_id, "HTTP sentence for unknown word");
      let message = format!("Unknown wordId: {}", body.word_id);
      (StatusCode::NOT_FOUND, Json(ErrorOut { message })).into_response()
    }
  }
}
