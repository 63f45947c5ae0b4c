//! Lesson content store: an immutable, validated, ordered deck of word pairs.
//!
//! The store is built once (built-in seeds or a TOML deck) and shared read-only
//! by every lesson. Construction rejects decks a lesson could not be played on.

use std::{collections::HashSet, sync::Arc};

use crate::domain::WordPair;
use crate::error::ContentError;
use crate::seeds::seed_word_pairs;
use crate::util::token_position;

#[derive(Clone, Debug)]
pub struct ContentStore {
  pairs: Arc<[WordPair]>,
}

impl ContentStore {
  /// Validate and freeze a deck.
  pub fn new(pairs: Vec<WordPair>) -> Result<Self, ContentError> {
    if pairs.is_empty() {
      return Err(ContentError::Empty);
    }

    let mut seen = HashSet::new();
    for wp in &pairs {
      if !seen.insert(wp.id.as_str()) {
        return Err(ContentError::DuplicateId(wp.id.clone()));
      }
      let position = token_position(&wp.example_mixed, &wp.dirty_word).ok_or_else(|| {
        ContentError::LoanwordMissing { id: wp.id.clone(), dirty_word: wp.dirty_word.clone() }
      })?;
      if wp.usage_notes.trim().is_empty() {
        return Err(ContentError::UsageNotesMissing { id: wp.id.clone() });
      }
      if token_position(&wp.example_pure, &wp.pure_word) != Some(position) {
        return Err(ContentError::PureWordMisplaced {
          id: wp.id.clone(),
          pure_word: wp.pure_word.clone(),
          position,
        });
      }
    }

    Ok(Self { pairs: pairs.into() })
  }

  /// The bundled deck.
  pub fn builtin() -> Result<Self, ContentError> {
    Self::new(seed_word_pairs())
  }

  pub fn len(&self) -> usize { self.pairs.len() }

  pub fn get(&self, index: usize) -> Option<&WordPair> { self.pairs.get(index) }

  pub fn iter(&self) -> impl Iterator<Item = &WordPair> { self.pairs.iter() }

  pub fn find(&self, id: &str) -> Option<&WordPair> {
    self.pairs.iter().find(|wp| wp.id == id)
  }

  pub fn is_last(&self, index: usize) -> bool { index + 1 == self.pairs.len() }
}

impl std::ops::Index<usize> for ContentStore {
  type Output = WordPair;

  fn index(&self, index: usize) -> &WordPair { &self.pairs[index] }
}
