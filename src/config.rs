use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, SubweaveError};

// Defaults for fields that older config files may not carry
fn default_max_steps() -> usize {
    10_000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub inference: InferenceConfig,
    pub translate: TranslateConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Which inference backend to talk to
    pub provider: InferenceProvider,
    /// Base URL of the inference service
    pub endpoint: String,
    /// Model used for both context synthesis and chunk translation
    pub model: String,
    /// Environment variable holding the API key (OpenAi provider only)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceProvider {
    /// Local ollama server (`/api/generate`)
    Ollama,
    /// OpenAI-compatible chat completions endpoint
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Maximum number of cues per chunk
    pub chunk_size: usize,
    /// Maximum re-translations of a chunk whose output fails validation
    pub max_retries: u32,
    /// Minimum step ceiling for one job; raised to the steps the job can need
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Target language, as a code (`fr`) or a name (`French`)
    pub target_language: Option<String>,
    /// Source caption track language code
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for translated files; defaults to the input file's directory
    pub directory: Option<PathBuf>,
    /// Replace an existing translated file instead of refusing
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: InferenceProvider::Ollama,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            api_key_env: default_api_key_env(),
            temperature: 0.3,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            max_retries: 2,
            max_steps: default_max_steps(),
            target_language: None,
            source_language: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubweaveError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubweaveError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubweaveError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubweaveError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values no job could run with
    pub fn validate(&self) -> Result<()> {
        if self.translate.chunk_size == 0 {
            return Err(SubweaveError::Config("chunk_size must be a positive integer".to_string()));
        }
        if self.translate.max_steps == 0 {
            return Err(SubweaveError::Config("max_steps must be a positive integer".to_string()));
        }
        if self.inference.endpoint.trim().is_empty() {
            return Err(SubweaveError::Config("inference endpoint is empty".to_string()));
        }
        if self.inference.model.trim().is_empty() {
            return Err(SubweaveError::Config("inference model is empty".to_string()));
        }
        Ok(())
    }
}
