//! Loading agent configuration (prompts, lesson timing, optional deck) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `LessonCfg` for expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::WordPair;
use crate::engine::DEFAULT_FEEDBACK_DELAY;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub lesson: LessonCfg,
  /// Replaces the built-in deck when non-empty.
  #[serde(default)]
  pub words: Vec<WordPair>,
}

/// Lesson timing knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LessonCfg {
  /// How long success/failure feedback stays up before it clears (or the view moves on).
  pub feedback_delay_ms: u64,
  pub lookup_timeout_secs: u64,
}

impl Default for LessonCfg {
  fn default() -> Self {
    Self {
      feedback_delay_ms: DEFAULT_FEEDBACK_DELAY.as_millis() as u64,
      lookup_timeout_secs: 20,
    }
  }
}

impl LessonCfg {
  pub fn feedback_delay(&self) -> Duration { Duration::from_millis(self.feedback_delay_ms) }
  pub fn lookup_timeout(&self) -> Duration { Duration::from_secs(self.lookup_timeout_secs) }
}

/// Prompts used by the OpenAI client.
/// You can override them in TOML if you need to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub explanation_system: String,
  pub explanation_user_template: String,
  pub sentence_system: String,
  pub sentence_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      explanation_system: "You are a Kurmanci Kurdish language coach for a mobile vocabulary app. Answer in plain English prose.".into(),
      explanation_user_template: "Explain the linguistic difference between the Arabic loanword \"{dirty}\" and the pure Kurdish (Kurmanci) word \"{pure}\". Provide cultural context and why using the pure version is beneficial for the language preservation. Keep it concise for a mobile app user.".into(),
      sentence_system: "You generate Kurmanci Kurdish practice sentences. Respond ONLY with strict JSON.".into(),
      sentence_user_template: "Generate a short everyday sentence in Kurdish Kurmanci that uses the word \"{dirty}\". Also provide the English translation. Return JSON with fields: sentence, translation.".into(),
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "paqij_backend", %path, words = cfg.words.len(), "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "paqij_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "paqij_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::DifficultyLevel;

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = parse_agent_config("").unwrap();
    assert!(cfg.words.is_empty());
    assert_eq!(cfg.lesson.feedback_delay(), Duration::from_millis(800));
    assert_eq!(cfg.lesson.lookup_timeout(), Duration::from_secs(20));
    assert!(cfg.prompts.explanation_user_template.contains("{dirty}"));
  }

  #[test]
  fn lesson_and_deck_sections_parse() {
    let cfg = parse_agent_config(
      r#"
        [lesson]
        feedback_delay_ms = 250

        [[words]]
        id = "x1"
        dirty_word = "Lazim"
        pure_word = "Pêwîst"
        example_mixed = "Lazim e."
        example_pure = "Pêwîst e."
        difficulty_level = "advanced"
        usage_notes = "custom"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.lesson.feedback_delay_ms, 250);
    assert_eq!(cfg.lesson.lookup_timeout_secs, 20);
    assert_eq!(cfg.words.len(), 1);
    assert_eq!(cfg.words[0].difficulty_level, DifficultyLevel::Advanced);
    assert_eq!(cfg.words[0].category, "");
  }

  #[test]
  fn partial_prompts_table_is_rejected() {
    assert!(parse_agent_config("[prompts]\nexplanation_system = \"x\"\n").is_err());
  }
}
