//! Google Gemini API client for embeddings and tool suggestions.
//!
//! Talks to the public `generativelanguage` REST endpoints.
//! See: <https://ai.google.dev/api>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use super::traits::{CompletionProvider, EmbeddingProvider};
use crate::{Embedding, MaitreError, Result};

/// Default base URL for the Gemini API
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

/// Default model for tool suggestions.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";

/// Client for the Gemini API.
///
/// Supports:
/// - Single and batched text embeddings
/// - Single-turn content generation
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    http: Client,
    base_url: String,
    embedding_model: String,
    chat_model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MaitreError::Configuration("Gemini API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MaitreError::Http(e.to_string()))?;

        Ok(Self {
            api_key,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        })
    }

    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response).await
    }

    /// Embed a single text with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let model = self.embedding_model.as_str();
        let response = self
            .post(
                &self.url(model, "embedContent"),
                &EmbedRequest::new(model, text),
            )
            .await?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| MaitreError::Http(e.to_string()))?;

        if body.embedding.values.is_empty() {
            return Err(MaitreError::EmptyResponse);
        }
        Ok(Embedding::new(body.embedding.values, model))
    }

    /// Embed several texts in one request. One embedding per input, in order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let model = self.embedding_model.as_str();
        let request = BatchEmbedRequest {
            requests: texts.iter().map(|t| EmbedRequest::new(model, t)).collect(),
        };
        let response = self
            .post(&self.url(model, "batchEmbedContents"), &request)
            .await?;

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| MaitreError::Http(e.to_string()))?;

        Ok(body
            .embeddings
            .into_iter()
            .map(|e| Embedding::new(e.values, model))
            .collect())
    }

    /// Generate text for a single-turn prompt.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let model = self.chat_model.as_str();
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .post(&self.url(model, "generateContent"), &request)
            .await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| MaitreError::Http(e.to_string()))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(MaitreError::EmptyResponse)
    }
}

fn map_transport_error(e: reqwest::Error) -> MaitreError {
    if e.is_timeout() {
        MaitreError::Timeout(e.to_string())
    } else {
        MaitreError::Http(e.to_string())
    }
}

/// Check response status and map to the appropriate error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    if body.contains("DEADLINE_EXCEEDED") {
        return Err(MaitreError::Timeout(body));
    }
    match status.as_u16() {
        401 | 403 => Err(MaitreError::AuthenticationFailed),
        429 => Err(MaitreError::RateLimited { retry_after }),
        504 => Err(MaitreError::Timeout(format!("gateway timeout: {body}"))),
        code => Err(MaitreError::Api {
            status: code,
            message: format!("Gemini API error: {body}"),
        }),
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

impl<'a> EmbedRequest<'a> {
    fn new(model: &str, text: &'a str) -> Self {
        Self {
            model: format!("models/{model}"),
            content: Content {
                parts: vec![Part { text }],
            },
        }
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct Values {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Values,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

// ============================================================================
// Provider Trait Implementations
// ============================================================================

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        GeminiClient::embed(self, text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        GeminiClient::embed_batch(self, texts).await
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new("  "),
            Err(MaitreError::Configuration(_))
        ));
    }

    #[test]
    fn embed_request_shape() {
        let body = serde_json::to_value(EmbedRequest::new("embedding-001", "xin chào")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "models/embedding-001",
                "content": {"parts": [{"text": "xin chào"}]}
            })
        );
    }

    #[test]
    fn url_strips_trailing_slash() {
        let client = GeminiClient::with_base_url("k", "http://localhost:1/").unwrap();
        assert_eq!(
            client.url("embedding-001", "embedContent"),
            "http://localhost:1/v1beta/models/embedding-001:embedContent"
        );
    }
}
