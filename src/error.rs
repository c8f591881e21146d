use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubweaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Output file already exists: {0} (enable overwrite to replace it)")]
    OutputExists(String),

    /// Job input that makes translation impossible (missing cues, target or memory)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Translation context generation failed: {0}")]
    ContextGeneration(String),

    #[error("Translation service error: {0}")]
    TranslationService(String),

    #[error("No subtitles found: {0}")]
    SourceNotFound(String),

    #[error("Subtitle source error: {0}")]
    Source(String),

    #[error("Invalid video reference: {0}")]
    InvalidVideoRef(String),

    #[error("Translation job exceeded the step ceiling of {0}")]
    StepLimitExceeded(usize),
}

pub type Result<T> = std::result::Result<T, SubweaveError>;
