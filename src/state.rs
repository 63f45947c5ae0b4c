//! Application state: the deck, lesson settings, OpenAI client, and dashboard progress.
//!
//! This module owns:
//!   - the validated content store (TOML deck or built-in seeds)
//!   - optional OpenAI client, also used as the explanation lookup
//!   - the single in-memory `UserProgress` aggregate
//!
//! Without OpenAI, lessons still run; every explanation falls back to usage notes.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::config::{load_agent_config_from_env, AgentConfig, LessonCfg};
use crate::content::ContentStore;
use crate::domain::UserProgress;
use crate::engine::LessonEngine;
use crate::error::ContentError;
use crate::explain::{ExplanationLookup, Unavailable};
use crate::openai::OpenAI;
use crate::seeds::seed_progress;
use crate::session::SessionHandle;

#[derive(Clone)]
pub struct AppState {
    pub content: ContentStore,
    pub lesson: LessonCfg,
    pub openai: Option<OpenAI>,
    pub lookup: Arc<dyn ExplanationLookup>,
    pub progress: Arc<RwLock<UserProgress>>,
}

impl AppState {
    /// Build state from env: load config, build the deck, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, ContentError> {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let openai = OpenAI::from_env(cfg.prompts.clone());
        if let Some(oa) = &openai {
            info!(target: "paqij_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "paqij_backend", "OpenAI disabled (no OPENAI_API_KEY). Explanations use usage notes.");
        }
        Self::from_parts(cfg, openai)
    }

    pub fn from_parts(cfg: AgentConfig, openai: Option<OpenAI>) -> Result<Self, ContentError> {
        let content = build_content(cfg.words)?;
        info!(target: "lesson", words = content.len(), "Deck ready");

        let lookup: Arc<dyn ExplanationLookup> = match &openai {
            Some(oa) => Arc::new(oa.clone()),
            None => Arc::new(Unavailable),
        };

        Ok(Self {
            content,
            lesson: cfg.lesson,
            openai,
            lookup,
            progress: Arc::new(RwLock::new(seed_progress())),
        })
    }

    /// Start a fresh play-through over the whole deck.
    #[instrument(level = "info", skip(self))]
    pub fn start_lesson(&self) -> Result<SessionHandle, ContentError> {
        let engine = LessonEngine::new(self.content.clone(), self.lesson.feedback_delay())?;
        Ok(SessionHandle::start(engine, self.lookup.clone(), self.lesson.lookup_timeout()))
    }

    /// Fold a completed lesson into the dashboard and return the new totals.
    #[instrument(level = "info", skip(self))]
    pub async fn record_completion(&self, score: u32) -> UserProgress {
        let mut progress = self.progress.write().await;
        progress.record_lesson(score, self.content.iter().map(|w| w.id.as_str()));
        info!(target: "lesson", score, points = progress.points, streak = progress.streak, "Lesson recorded");
        progress.clone()
    }

    pub async fn progress(&self) -> UserProgress {
        self.progress.read().await.clone()
    }
}

/// A configured deck wins over the seeds, unless it is invalid.
fn build_content(words: Vec<crate::domain::WordPair>) -> Result<ContentStore, ContentError> {
    if words.is_empty() {
        return ContentStore::builtin();
    }
    match ContentStore::new(words) {
        Ok(store) => Ok(store),
        Err(e) => {
            error!(target: "lesson", error = %e, "Configured deck rejected; using built-in deck");
            ContentStore::builtin()
        }
    }
}
