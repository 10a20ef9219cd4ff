use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generation::{GenerationError, GenerationRequest, TextGenerator};

const MAX_LOGGED_BODY_BYTES: usize = 512;

/// Production client for `models/{model}:generateContent`.
///
/// No client-side timeout or retry: a hung call is bounded by the transport
/// default and a single failure yields a single apology upstream.
pub struct GeminiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: Client::new(), api_key, base_url: trim_trailing_slash(base_url.into()) }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = GenerateContentRequest::from(request);

        // The key travels in a header, not the query string, so it cannot
        // leak through reqwest error messages that embed the URL.
        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body: truncate_body(&body) });
        }

        let decoded: GenerateContentResponse =
            response.json().await.map_err(GenerationError::Decode)?;

        let text = decoded.candidate_text().ok_or(GenerationError::EmptyCandidates)?;
        debug!(model = %request.model, chars = text.len(), "gemini generation succeeded");
        Ok(text)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_LOGGED_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content { parts: vec![Part { text: request.prompt.clone() }] }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateContentResponse {
    /// The generated text: all parts of the first candidate, concatenated.
    fn candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        if content.parts.is_empty() {
            return None;
        }
        Some(content.parts.iter().map(|part| part.text.as_str()).collect())
    }
}
