//! Gemini REST client: `embedContent` and `generateContent`.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::{Embedder, GenerationParams, TextGenerator, send_with_retry};
use crate::config::GeminiConfig;
use crate::error::{CareerError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";
const QUERY_TASK_TYPE: &str = "RETRIEVAL_QUERY";

/// Async client for the Gemini embedding and generation endpoints.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    generation_model: String,
    timeout: Duration,
    max_retries: u32,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        embedding_model: &str,
        generation_model: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(CareerError::MissingConfig(
                "Gemini API key is empty; set GOOGLE_API_KEY".to_string(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CareerError::Config(format!(
                "gemini.base_url must be an http(s) URL, got {base_url}"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key.trim())
                .map_err(|err| CareerError::Config(format!("invalid Gemini API key: {err}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let timeout = timeout.max(Duration::from_secs(1));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| CareerError::Config(format!("gemini http client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: strip_model_prefix(embedding_model).to_string(),
            generation_model: strip_model_prefix(generation_model).to_string(),
            timeout,
            max_retries,
        })
    }

    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            CareerError::MissingConfig(
                "Gemini API key not configured; set GOOGLE_API_KEY or [gemini].api_key".to_string(),
            )
        })?;
        Self::new(
            api_key,
            &config.base_url,
            &config.embedding_model,
            &config.generation_model,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{method}",
            self.base_url,
            urlencoding::encode(model)
        )
    }
}

impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.model_url(&self.embedding_model, "embedContent");
        let model = format!("models/{}", self.embedding_model);
        let request = EmbedRequest {
            model: &model,
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: QUERY_TASK_TYPE,
        };

        let response = send_with_retry(
            || self.client.post(&url).json(&request),
            "embedContent",
            self.max_retries,
            self.timeout,
            CareerError::Embedding,
        )
        .await?;
        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|err| CareerError::Embedding(format!("parse embedContent response: {err}")))?;

        let values = payload.embedding.values;
        if values.is_empty() {
            return Err(CareerError::Embedding(
                "embedContent returned an empty vector".to_string(),
            ));
        }
        debug!(dims = values.len(), "embedded query");
        Ok(values)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<Option<String>> {
        let url = self.model_url(&self.generation_model, "generateContent");
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_output_tokens,
                temperature: params.temperature,
            },
        };

        // Rewrites fall back on failure, so no retries here.
        let response = send_with_retry(
            || self.client.post(&url).json(&request),
            "generateContent",
            0,
            self.timeout,
            CareerError::Generation,
        )
        .await?;
        let payload: GenerateResponse = response.json().await.map_err(|err| {
            CareerError::Generation(format!("parse generateContent response: {err}"))
        })?;

        Ok(payload.first_text())
    }
}

fn strip_model_prefix(model: &str) -> &str {
    model.trim().trim_start_matches("models/")
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
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, or `None` when there is nothing usable.
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}
