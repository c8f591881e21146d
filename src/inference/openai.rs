use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InferenceConfig;
use crate::error::{Result, SubweaveError};
use super::{InferenceClient, build_http_client, join_url};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiClient {
    client: Client,
    config: InferenceConfig,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.trim().is_empty());
        Ok(Self { client, config, api_key })
    }

    fn build_request(&self, system_instruction: &str, user_content: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system_instruction.to_string() },
                ChatMessage { role: "user".to_string(), content: user_content.to_string() },
            ],
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    async fn complete(&self, system_instruction: &str, user_content: &str) -> Result<String> {
        let request = self.build_request(system_instruction, user_content);
        let url = join_url(&self.config.endpoint, "v1/chat/completions");

        debug!("Sending chat completion request to: {}", url);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SubweaveError::TranslationService(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubweaveError::TranslationService(format!(
                "Chat completion API error {}: {}", status, error_text
            )));
        }

        let chat: ChatResponse = response.json().await
            .map_err(|e| SubweaveError::TranslationService(format!("Failed to parse response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| SubweaveError::TranslationService("Chat response contained no choices".to_string()))
    }

    async fn check_availability(&self) -> Result<()> {
        if self.api_key.is_none() {
            return Err(SubweaveError::Config(format!(
                "API key not set: export {} before using the OpenAi provider",
                self.config.api_key_env
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceProvider;

    fn config() -> InferenceConfig {
        InferenceConfig {
            provider: InferenceProvider::OpenAi,
            endpoint: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "SUBWEAVE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            temperature: 0.0,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_request_messages() {
        let client = OpenAiClient::new(config()).unwrap();
        let value = serde_json::to_value(client.build_request("sys", "usr")).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "sys");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_response_decoding() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"1. Bonjour"},"finish_reason":"stop"}]}"#;
        let chat: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(chat.choices[0].message.content, "1. Bonjour");
    }

    #[tokio::test]
    async fn test_missing_key_fails_availability() {
        let client = OpenAiClient::new(config()).unwrap();
        assert!(matches!(client.check_availability().await, Err(SubweaveError::Config(_))));
    }
}
