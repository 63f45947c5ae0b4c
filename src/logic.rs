//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating a fresh example sentence for a word (model first, local fallback)
//!   - Turning lesson snapshots into outgoing messages

use tracing::{error, instrument};

use crate::engine::LessonSnapshot;
use crate::protocol::{to_out, SentenceOut, ServerWsMessage};
use crate::seeds::fallback_sentence;
use crate::state::AppState;
use crate::util::trunc_for_log;

/// `None` if the word id is unknown.
#[instrument(level = "info", skip(state), fields(%word_id))]
pub async fn sentence_for_word(state: &AppState, word_id: &str) -> Option<SentenceOut> {
  let word = state.content.find(word_id)?;

  if let Some(oa) = &state.openai {
    match oa.generate_sentence(&word.dirty_word).await {
      Ok(gen) => {
        return Some(SentenceOut { sentence: gen.sentence, translation: gen.translation, source: "model" });
      }
      Err(e) => {
        error!(target: "paqij_backend", %word_id, error = %trunc_for_log(&e, 200), "Sentence generation failed; using fallback.");
      }
    }
  }

  let (sentence, translation) = fallback_sentence(&word.dirty_word);
  Some(SentenceOut { sentence, translation, source: "fallback" })
}

/// Message describing the lesson as it stands, with the word the snapshot points at.
pub fn lesson_message(state: &AppState, snapshot: LessonSnapshot) -> ServerWsMessage {
  match state.content.get(snapshot.current_index) {
    Some(word) => ServerWsMessage::Lesson { word: to_out(word), snapshot },
    None => ServerWsMessage::Error { message: format!("No word at index {}", snapshot.current_index) },
  }
}
