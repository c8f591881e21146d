// Inference service clients
//
// The translation pipeline only needs a text-in/text-out completion call.
// This module hides the concrete backend behind a trait:
// - Ollama: local server, `/api/generate`
// - OpenAi: OpenAI-compatible `/v1/chat/completions`

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::{InferenceConfig, InferenceProvider};
use crate::error::{Result, SubweaveError};

/// Text completion service used for context synthesis and chunk translation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one completion. Any `Ok` value is taken as the model's answer.
    async fn complete(&self, system_instruction: &str, user_content: &str) -> Result<String>;

    /// Check that the service is reachable and the model is usable
    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory for creating inference clients
pub struct InferenceClientFactory;

impl InferenceClientFactory {
    /// Create the client selected by the configuration
    pub fn create(config: &InferenceConfig) -> Result<Box<dyn InferenceClient>> {
        match config.provider {
            InferenceProvider::Ollama => Ok(Box::new(OllamaClient::new(config.clone())?)),
            InferenceProvider::OpenAi => Ok(Box::new(OpenAiClient::new(config.clone())?)),
        }
    }
}

pub(crate) fn build_http_client(config: &InferenceConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("subweave/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SubweaveError::Config(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn join_url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
}
