//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{DifficultyLevel, UserProgress, WordPair};
use crate::engine::LessonSnapshot;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartLesson,
    Identify { token: String },
    Replace { option: String },
    Advance,
    Cancel,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Lesson {
        snapshot: LessonSnapshot,
        word: WordOut,
    },
    Complete {
        score: u32,
        progress: UserProgress,
    },
    Cancelled,
    Error {
        message: String,
    },
}

/// DTO used by both WS and HTTP for word delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordOut {
    pub id: String,
    pub dirty_word: String,
    pub pure_word: String,
    pub meaning_english: String,
    pub example_mixed: String,
    pub example_pure: String,
    /// `example_mixed` split the way the client renders tappable tokens.
    pub tokens: Vec<String>,
    pub meaning_sentence_english: String,
    pub category: String,
    pub difficulty_level: DifficultyLevel,
    pub usage_notes: String,
}

/// Convert a `WordPair` (internal) to the public DTO.
pub fn to_out(w: &WordPair) -> WordOut {
    WordOut {
        id: w.id.clone(),
        dirty_word: w.dirty_word.clone(),
        pure_word: w.pure_word.clone(),
        meaning_english: w.meaning_english.clone(),
        example_mixed: w.example_mixed.clone(),
        example_pure: w.example_pure.clone(),
        tokens: w.example_mixed.split_whitespace().map(str::to_string).collect(),
        meaning_sentence_english: w.meaning_sentence_english.clone(),
        category: w.category.clone(),
        difficulty_level: w.difficulty_level,
        usage_notes: w.usage_notes.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct WordsOut {
    pub words: Vec<WordOut>,
}

#[derive(Deserialize)]
pub struct SentenceIn {
    #[serde(rename = "wordId")]
    pub word_id: String,
}
#[derive(Debug, Serialize)]
pub struct SentenceOut {
    pub sentence: String,
    pub translation: String,
    /// "model" or "fallback".
    pub source: &'static str,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
