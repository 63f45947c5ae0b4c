//! Explanation lookup capability injected into lesson sessions.
//!
//! Implementations may fail freely; the engine treats every failure the same way
//! and shows the word pair's usage notes instead.

use async_trait::async_trait;

use crate::error::LookupError;

#[async_trait]
pub trait ExplanationLookup: Send + Sync {
  async fn explain(&self, dirty_word: &str, pure_word: &str) -> Result<String, LookupError>;
}

/// Used when no model is configured.
pub struct Unavailable;

#[async_trait]
impl ExplanationLookup for Unavailable {
  async fn explain(&self, _dirty_word: &str, _pure_word: &str) -> Result<String, LookupError> {
    Err(LookupError::Unavailable)
  }
}
