use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::InferenceConfig;
use crate::error::{Result, SubweaveError};
use super::{InferenceClient, build_http_client, join_url};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

/// Client for a local ollama server
pub struct OllamaClient {
    client: Client,
    config: InferenceConfig,
}

impl OllamaClient {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    fn build_request(&self, system_instruction: &str, user_content: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.clone(),
            system: system_instruction.to_string(),
            prompt: user_content.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn complete(&self, system_instruction: &str, user_content: &str) -> Result<String> {
        let request = self.build_request(system_instruction, user_content);
        let url = join_url(&self.config.endpoint, "api/generate");

        debug!("Sending completion request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubweaveError::TranslationService(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubweaveError::TranslationService(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| SubweaveError::TranslationService(format!("Failed to parse response: {}", e)))?;

        debug!("Raw Ollama response: {} chars", generated.response.len());
        Ok(generated.response)
    }

    async fn check_availability(&self) -> Result<()> {
        let url = join_url(&self.config.endpoint, "api/show");

        let response = self.client
            .post(&url)
            .json(&json!({ "name": self.config.model }))
            .send()
            .await
            .map_err(|e| SubweaveError::TranslationService(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.model);
            Ok(())
        } else {
            Err(SubweaveError::TranslationService(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.model, self.config.model
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let mut config = InferenceConfig::default();
        config.model = "qwen2.5:7b".to_string();
        config.temperature = 0.2;
        let client = OllamaClient::new(config).unwrap();

        let request = client.build_request("be terse", "1. Hello");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "qwen2.5:7b");
        assert_eq!(value["system"], "be terse");
        assert_eq!(value["prompt"], "1. Hello");
        assert_eq!(value["stream"], false);
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_service_error() {
        let mut config = InferenceConfig::default();
        config.endpoint = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 2;
        let client = OllamaClient::new(config).unwrap();

        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(SubweaveError::TranslationService(_))));
    }
}
