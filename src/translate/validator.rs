use tracing::warn;

use super::translator::ValidationStatus;

/// Fenced code block delimiter; breaks line-based reassembly when present
pub const CODE_FENCE: &str = "```";

/// Validator decision for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Accepted; carries the cleaned text
    Valid(String),
    /// Rejected; carries the incremented retry count
    NeedsRetry(u32),
    /// Rejected with no retries left, or nothing to validate
    MaxRetriesExceeded,
}

impl Validation {
    pub fn status(&self) -> ValidationStatus {
        match self {
            Validation::Valid(_) => ValidationStatus::Valid,
            Validation::NeedsRetry(_) => ValidationStatus::NeedsRetry,
            Validation::MaxRetriesExceeded => ValidationStatus::MaxRetriesExceeded,
        }
    }
}

/// Structural check of a translated chunk
#[derive(Debug, Clone, Copy)]
pub struct FormatValidator {
    max_retries: u32,
}

impl FormatValidator {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn validate(&self, raw_output: Option<&str>, retry_count: u32) -> Validation {
        let Some(text) = raw_output else {
            warn!("No translated text to validate");
            return Validation::MaxRetriesExceeded;
        };

        if !text.contains(CODE_FENCE) {
            return Validation::Valid(clean_output(text));
        }

        if retry_count < self.max_retries {
            warn!("Translated chunk contains a code fence, retry {}/{}", retry_count + 1, self.max_retries);
            Validation::NeedsRetry(retry_count + 1)
        } else {
            warn!("Translated chunk still contains a code fence after {} retries", retry_count);
            Validation::MaxRetriesExceeded
        }
    }
}

/// Strip one surrounding fenced-block wrapper, if any, and trim whitespace
pub fn clean_output(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(inner) = trimmed.strip_prefix(CODE_FENCE) {
        if let Some(inner) = inner.strip_suffix(CODE_FENCE) {
            // Drop the language tag on the opening fence line
            let body = match inner.split_once('\n') {
                Some((_, rest)) => rest,
                None => inner,
            };
            return body.trim().to_string();
        }
    }

    trimmed.to_string()
}
