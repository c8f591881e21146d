use tracing::{debug, info};

use crate::error::Result;
use crate::inference::InferenceClient;
use crate::language;
use super::chunk::Chunk;
use super::context::TranslationMemory;
use super::prompts;

/// Where a translation attempt stands with respect to validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Pending,
    Valid,
    NeedsRetry,
    MaxRetriesExceeded,
}

/// One model answer for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTranslationAttempt {
    pub chunk_position: usize,
    /// 1-based attempt number for this chunk
    pub attempt: u32,
    /// Model output; `None` when the model returned nothing usable
    pub raw_output: Option<String>,
    pub status: ValidationStatus,
}

/// Sends one chunk plus the translation memory to the inference service
pub struct ChunkTranslator<'a> {
    client: &'a dyn InferenceClient,
    target_language: String,
}

impl<'a> ChunkTranslator<'a> {
    pub fn new(client: &'a dyn InferenceClient, target_language: &str) -> Self {
        Self {
            client,
            target_language: language::display_name(target_language),
        }
    }

    /// Translate a chunk. `retry` adds a formatting reminder after a rejected answer.
    ///
    /// Service failures are returned as errors and are not retried here.
    pub async fn translate(
        &self,
        chunk: &Chunk,
        memory: &TranslationMemory,
        attempt: u32,
        retry: bool,
    ) -> Result<ChunkTranslationAttempt> {
        let (system, user) = self.build_prompts(chunk, memory, retry);

        info!(
            "Translating chunk {} ({} cues), attempt {}{}",
            chunk.position + 1,
            chunk.len(),
            attempt,
            if retry { " [retry]" } else { "" }
        );
        let output = self.client.complete(&system, &user).await?;
        debug!("Chunk {} raw output: {} chars", chunk.position + 1, output.len());

        Ok(ChunkTranslationAttempt {
            chunk_position: chunk.position,
            attempt,
            raw_output: Some(output).filter(|text| !text.trim().is_empty()),
            status: ValidationStatus::Pending,
        })
    }

    fn build_prompts(&self, chunk: &Chunk, memory: &TranslationMemory, retry: bool) -> (String, String) {
        let mut system = prompts::render(prompts::CHUNK_SYSTEM_PROMPT, &[("target_language", &self.target_language)]);
        if retry {
            system.push_str(prompts::RETRY_REMINDER);
        }

        let user = prompts::render(
            prompts::CHUNK_USER_PROMPT,
            &[
                ("target_language", &self.target_language),
                ("translation_memory", memory.as_str()),
                ("numbered_subtitle_lines", &chunk.text),
            ],
        );

        (system, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubweaveError;
    use crate::inference::MockInferenceClient;

    fn chunk() -> Chunk {
        Chunk {
            position: 0,
            indices: vec![1, 2],
            text: "1. Hello\n2. World".to_string(),
        }
    }

    #[tokio::test]
    async fn test_returns_raw_output_unmodified() {
        let mut client = MockInferenceClient::new();
        client
            .expect_complete()
            .withf(|system, user| {
                system.contains("French")
                    && !system.contains("previous answer was rejected")
                    && user.contains("1. Hello\n2. World")
                    && user.contains("glossary here")
            })
            .returning(|_, _| Ok("  1. Bonjour\n2. Monde\n".to_string()));

        let translator = ChunkTranslator::new(&client, "fr");
        let attempt = translator
            .translate(&chunk(), &TranslationMemory::new("glossary here"), 1, false)
            .await
            .unwrap();

        assert_eq!(attempt.chunk_position, 0);
        assert_eq!(attempt.attempt, 1);
        assert_eq!(attempt.raw_output.as_deref(), Some("  1. Bonjour\n2. Monde\n"));
        assert_eq!(attempt.status, ValidationStatus::Pending);
    }

    #[tokio::test]
    async fn test_retry_adds_reminder() {
        let mut client = MockInferenceClient::new();
        client
            .expect_complete()
            .withf(|system, _| system.contains("previous answer was rejected"))
            .times(1)
            .returning(|_, _| Ok("1. Bonjour\n2. Monde".to_string()));

        let translator = ChunkTranslator::new(&client, "fr");
        let attempt = translator
            .translate(&chunk(), &TranslationMemory::new("m"), 2, true)
            .await
            .unwrap();
        assert_eq!(attempt.attempt, 2);
    }

    #[tokio::test]
    async fn test_blank_output_is_absent() {
        let mut client = MockInferenceClient::new();
        client.expect_complete().returning(|_, _| Ok(" \n ".to_string()));

        let translator = ChunkTranslator::new(&client, "fr");
        let attempt = translator
            .translate(&chunk(), &TranslationMemory::new("m"), 1, false)
            .await
            .unwrap();
        assert!(attempt.raw_output.is_none());
    }

    #[tokio::test]
    async fn test_service_error_is_not_retried() {
        let mut client = MockInferenceClient::new();
        client
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(SubweaveError::TranslationService("503".to_string())));

        let translator = ChunkTranslator::new(&client, "fr");
        let result = translator.translate(&chunk(), &TranslationMemory::new("m"), 1, false).await;
        assert!(matches!(result, Err(SubweaveError::TranslationService(_))));
    }
}
