use async_trait::async_trait;
use sabio_core::config::GeminiConfig;
use thiserror::Error;

/// One outbound generation call: the user's free text plus the
/// process-wide knobs. Constructed per invocation, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// The read-only generation knobs, resolved once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl From<&GeminiConfig> for GenerationSettings {
    fn from(config: &GeminiConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }
}

impl GenerationSettings {
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            model: self.model.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("gemini request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("gemini returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("failed to decode gemini response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("gemini response contained no candidate text")]
    EmptyCandidates,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
