use std::fmt;
use tracing::{debug, info};

use crate::error::{Result, SubweaveError};
use crate::inference::InferenceClient;
use crate::language;
use crate::subtitle::Cue;
use super::prompts;

/// Shared context for every chunk of a job: summary, glossary, voice and risk notes.
///
/// The content is whatever the model produced; it is never parsed, only
/// forwarded to chunk translation. It is created once and not mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationMemory(String);

impl TranslationMemory {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TranslationMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the translation memory from the full original text
pub struct ContextSynthesizer<'a> {
    client: &'a dyn InferenceClient,
}

impl<'a> ContextSynthesizer<'a> {
    pub fn new(client: &'a dyn InferenceClient) -> Self {
        Self { client }
    }

    pub async fn synthesize(&self, cues: &[Cue], target_language: &str) -> Result<TranslationMemory> {
        if cues.is_empty() {
            return Err(SubweaveError::ContextGeneration("subtitle has no cues".to_string()));
        }
        if target_language.trim().is_empty() {
            return Err(SubweaveError::ContextGeneration("target language is not set".to_string()));
        }

        let language_name = language::display_name(target_language);
        let full_text = cues.iter().map(|cue| cue.text.as_str()).collect::<Vec<_>>().join("\n");

        let system = prompts::render(prompts::CONTEXT_SYSTEM_PROMPT, &[("target_language", &language_name)]);
        let user = prompts::render(
            prompts::CONTEXT_USER_PROMPT,
            &[("target_language", &language_name), ("subtitle_full_text", &full_text)],
        );

        info!("Generating translation memory for {} cues ({})", cues.len(), language_name);
        let memory = self.client.complete(&system, &user).await?;
        debug!("Translation memory: {} chars", memory.len());

        Ok(TranslationMemory::new(memory))
    }
}
