//! Domain models: word pairs, lesson phases, feedback, and the learner's progress aggregate.

use serde::{Deserialize, Serialize};

/// How hard a word pair is. Display-only; the engine never branches on it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
  Beginner,
  Intermediate,
  Advanced,
}
impl Default for DifficultyLevel {
  fn default() -> Self { DifficultyLevel::Beginner }
}

/// One loanword -> pure word exercise.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordPair {
  pub id: String,
  pub dirty_word: String,
  pub pure_word: String,
  #[serde(default)] pub meaning_english: String,
  pub example_mixed: String,
  pub example_pure: String,
  #[serde(default)] pub meaning_sentence_english: String,
  #[serde(default)] pub category: String,
  #[serde(default)] pub difficulty_level: DifficultyLevel,
  #[serde(default)] pub usage_notes: String,
}

/// Per-item phase of a lesson. `Complete` is session-terminal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Identify,
  Replace,
  Reinforce,
  Complete,
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Identify => write!(f, "identify"),
      Self::Replace => write!(f, "replace"),
      Self::Reinforce => write!(f, "reinforce"),
      Self::Complete => write!(f, "complete"),
    }
  }
}

/// Outcome of the most recent attempt, shown briefly by the client.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
  Correct,
  Incorrect,
}

/// Dashboard aggregate owned by the application, updated once per finished lesson.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProgress {
  pub points: u32,
  pub level: u32,
  pub streak: u32,
  pub mastered_ids: Vec<String>,
  pub accuracy: u32,
}

impl UserProgress {
  /// Fold a finished lesson into the aggregate.
  pub fn record_lesson<'a>(&mut self, score: u32, word_ids: impl IntoIterator<Item = &'a str>) {
    self.points += score;
    self.streak += 1;
    for id in word_ids {
      if !self.mastered_ids.iter().any(|m| m == id) {
        self.mastered_ids.push(id.to_string());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_lesson_adds_points_and_streak_once() {
    let mut p = UserProgress { points: 10, level: 1, streak: 0, mastered_ids: vec!["a".into()], accuracy: 90 };
    p.record_lesson(75, ["a", "b"]);
    assert_eq!(p.points, 85);
    assert_eq!(p.streak, 1);
    assert_eq!(p.mastered_ids, vec!["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn phase_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Phase::Reinforce).unwrap(), "\"reinforce\"");
    assert_eq!(Phase::Complete.to_string(), "complete");
  }
}
