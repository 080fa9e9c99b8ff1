//! Embedding provider trait and implementations.
//!
//! This module defines the interface for generating embeddings, an
//! OpenAI-compatible HTTP provider, and [`EmbeddingBackend`], which records
//! whether a provider is configured at all.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use codeseek_config::EmbeddingsConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during embedding generation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited after {0} retries")]
    RateLimited(u32),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Trait for embedding providers.
///
/// Implementations should be Send + Sync to allow use in async contexts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts in a batch
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the number of dimensions
    fn dimensions(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Whether semantic search has a provider to work with.
///
/// Call sites match on this instead of checking an availability flag, so
/// the disabled case cannot be forgotten.
#[derive(Clone)]
pub enum EmbeddingBackend {
    Enabled(Arc<dyn EmbeddingProvider>),
    Disabled { reason: String },
}

impl EmbeddingBackend {
    /// Build the backend from configuration.
    ///
    /// A missing endpoint or key disables semantic search; it is never an
    /// error.
    pub fn from_config(config: &EmbeddingsConfig) -> Self {
        let endpoint = config.resolved_endpoint();
        let api_key = config.resolved_api_key();

        match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) => {
                info!("Semantic search enabled ({} via {})", config.model, endpoint);
                let provider = HttpEmbeddings::new(
                    endpoint,
                    api_key,
                    Some(config.model.clone()),
                    Some(config.dimensions),
                )
                .with_timeout(Duration::from_secs(config.timeout_secs));
                Self::Enabled(Arc::new(provider))
            }
            (None, _) => Self::disabled("embedding endpoint is not configured"),
            (_, None) => Self::disabled("embedding API key is not configured"),
        }
    }

    pub fn enabled(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::Enabled(provider)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        info!("Semantic search disabled: {}", reason);
        Self::Disabled { reason }
    }

    pub fn provider(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        match self {
            Self::Enabled(provider) => Some(provider),
            Self::Disabled { .. } => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Why semantic search is off, if it is.
    pub fn disabled_reason(&self) -> Option<&str> {
        match self {
            Self::Enabled(_) => None,
            Self::Disabled { reason } => Some(reason),
        }
    }
}

impl std::fmt::Debug for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled(provider) => f
                .debug_tuple("Enabled")
                .field(&provider.model_name())
                .finish(),
            Self::Disabled { reason } => f.debug_struct("Disabled").field("reason", reason).finish(),
        }
    }
}

/// Request body for embedding API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// Response from embedding API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in response
#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints.
///
/// The key is sent both as a bearer token and as an `api-key` header so the
/// same client works against OpenAI and Azure OpenAI deployments.
pub struct HttpEmbeddings {
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: Client,
    max_retries: u32,
}

impl HttpEmbeddings {
    /// Create a provider for `endpoint`.
    ///
    /// Defaults to `text-embedding-3-small` with 1536 dimensions.
    pub fn new(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        dimensions: Option<usize>,
    ) -> Self {
        Self {
            endpoint,
            api_key,
            model: model.unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dimensions: dimensions.unwrap_or(1536),
            client: Client::new(),
            max_retries: 3,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    "Failed to build HTTP client with {:?} timeout, using defaults: {}",
                    timeout, e
                );
                Client::new()
            }
        };
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send embedding request with retry logic for rate limits.
    async fn send_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let request_body = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
        };

        let mut retry_count = 0;
        let mut backoff_secs = 1u64;

        loop {
            debug!(
                "Sending embedding request for {} texts to {}",
                expected, self.endpoint
            );

            let response = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("api-key", &self.api_key)
                .json(&request_body)
                .send()
                .await
                .map_err(|e| EmbeddingError::NetworkError(e.to_string()))?;

            let status = response.status();

            if status.is_success() {
                let embedding_response: EmbeddingResponse = response
                    .json()
                    .await
                    .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

                if embedding_response.data.len() != expected {
                    return Err(EmbeddingError::InvalidResponse(format!(
                        "expected {} embeddings, got {}",
                        expected,
                        embedding_response.data.len()
                    ))
                    .into());
                }

                // Sort by index to ensure correct order
                let mut embeddings: Vec<(usize, Vec<f32>)> = embedding_response
                    .data
                    .into_iter()
                    .map(|d| (d.index, d.embedding))
                    .collect();
                embeddings.sort_by_key(|(idx, _)| *idx);

                return Ok(embeddings.into_iter().map(|(_, emb)| emb).collect());
            }

            if status.as_u16() == 429 {
                retry_count += 1;
                if retry_count > self.max_retries {
                    return Err(EmbeddingError::RateLimited(self.max_retries).into());
                }

                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(backoff_secs);

                warn!(
                    "Rate limited, retrying after {} seconds (attempt {}/{})",
                    retry_after, retry_count, self.max_retries
                );

                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                backoff_secs *= 2;
                continue;
            }

            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::ApiError(format!(
                "{}: {}",
                status.as_u16(),
                error_body
            ))
            .into());
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding returned".into()).into())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} texts", texts.len());
        self.send_request(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
