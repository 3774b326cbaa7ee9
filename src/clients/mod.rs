//! Remote collaborators: generative model, embedding model, vector index.
//!
//! The search pipeline only sees these traits, so tests can swap in
//! in-process fakes and deployments can swap backends.

use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{CareerError, Result};

pub mod chroma;
pub mod gemini;

pub use chroma::ChromaIndex;
pub use gemini::GeminiClient;

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Generative text model.
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// Returns `Ok(None)` when the model produced no candidate text, for
    /// example because the output was safety-filtered.
    fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Embedding model.
pub trait Embedder: Send + Sync {
    /// Convert `text` to a dense vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

/// Nearest-neighbor vector index.
pub trait VectorIndex: Send + Sync {
    /// Return up to `n_results` neighbors of `embedding`, best first.
    fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> impl Future<Output = Result<IndexQueryResult>> + Send;
}

/// Raw nearest-neighbor response: three index-aligned arrays.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexQueryResult {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub distances: Vec<f64>,
    #[serde(default)]
    pub metadatas: Vec<Option<Map<String, Value>>>,
}

/// Send a request built by `build`, retrying transient failures.
///
/// `max_retries` extra attempts are made after the first one for connect
/// and timeout errors, HTTP 429 and 5xx. Non-retryable failures are wrapped
/// with `wrap` so each client reports its own error variant.
pub(crate) async fn send_with_retry<F>(
    build: F,
    operation: &'static str,
    max_retries: u32,
    timeout: Duration,
    wrap: fn(String) -> CareerError,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                if should_retry(status) && attempt < max_retries {
                    attempt += 1;
                    warn!(operation, %status, attempt, "retrying remote call");
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }
                return Err(wrap(format!(
                    "{operation} request failed ({status}): {}",
                    clip(&body)
                )));
            }
            Err(err) => {
                if is_retryable_error(&err) && attempt < max_retries {
                    attempt += 1;
                    warn!(operation, error = %err, attempt, "retrying remote call");
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }
                if err.is_timeout() {
                    return Err(CareerError::Timeout {
                        operation,
                        seconds: timeout.as_secs(),
                    });
                }
                return Err(wrap(format!("{operation} request failed: {err}")));
            }
        }
    }
}

fn clip(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.chars().count() <= LIMIT {
        return body.to_string();
    }
    let mut out: String = body.chars().take(LIMIT).collect();
    out.push('…');
    out
}

pub(crate) fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

pub(crate) fn retry_backoff(attempt: u32) -> Duration {
    let capped = attempt.min(5);
    Duration::from_millis(200 * (1 << capped))
}
