//! Seed data: the bundled Kurmanci deck and small fallbacks used when the model is unavailable.

use crate::domain::{DifficultyLevel, UserProgress, WordPair};

#[allow(clippy::too_many_arguments)]
fn pair(
  id: &str,
  dirty_word: &str,
  pure_word: &str,
  meaning_english: &str,
  example_mixed: &str,
  example_pure: &str,
  meaning_sentence_english: &str,
  category: &str,
  difficulty_level: DifficultyLevel,
  usage_notes: &str,
) -> WordPair {
  WordPair {
    id: id.into(),
    dirty_word: dirty_word.into(),
    pure_word: pure_word.into(),
    meaning_english: meaning_english.into(),
    example_mixed: example_mixed.into(),
    example_pure: example_pure.into(),
    meaning_sentence_english: meaning_sentence_english.into(),
    category: category.into(),
    difficulty_level,
    usage_notes: usage_notes.into(),
  }
}

/// Built-in deck, played in this order. Each example sentence carries the word uninflected
/// so it can be tapped in the identify phase.
pub fn seed_word_pairs() -> Vec<WordPair> {
  use DifficultyLevel::*;
  vec![
    pair(
      "wp1", "Lazim", "Pêwîst", "Necessary / Must",
      "Lazim e ez herim.", "Pêwîst e ez herim.", "It is necessary that I go.",
      "Common Expressions", Beginner,
      "Lazim is an Arabic loanword widely used. Pêwîst is the authentic Kurdish equivalent.",
    ),
    pair(
      "wp2", "Heval", "Dost", "Friend",
      "Heval li vir e.", "Dost li vir e.", "The friend is here.",
      "Social", Beginner,
      "While heval is common, dost carries a deeper sense of purity in certain contexts.",
    ),
    pair(
      "wp3", "Fikre", "Raman", "Idea / Thought",
      "Fikre pir baş e.", "Raman pir baş e.", "The idea is very good.",
      "Abstract Concepts", Intermediate,
      "Fikr (Arabic) is often replaced by Raman in literary Kurdish.",
    ),
    pair(
      "wp4", "Muntezir", "Hêvîdar", "Waiting / Hopeful",
      "Ez muntezir im.", "Ez hêvîdar im.", "I am waiting.",
      "Emotions", Intermediate,
      "Hêvîdar literally means holder of hope/expectation.",
    ),
    pair(
      "wp5", "Cewab", "Bersiv", "Answer",
      "Cewab çi ye?", "Bersiv çi ye?", "What is the answer?",
      "Social", Beginner,
      "Bersiv is the standardized Kurmanci word for response.",
    ),
  ]
}

/// Dashboard numbers a fresh process starts with.
pub fn seed_progress() -> UserProgress {
  UserProgress { points: 320, level: 2, streak: 4, mastered_ids: Vec::new(), accuracy: 88 }
}

/// Last-resort example sentence when generation fails: (sentence, translation).
pub fn fallback_sentence(dirty_word: &str) -> (String, String) {
  (
    format!("Ez îro pir {} im.", dirty_word),
    format!("I am very {} today.", dirty_word),
  )
}
