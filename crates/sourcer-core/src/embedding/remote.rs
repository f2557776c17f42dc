//! Hosted embedding providers over HTTP.
//!
//! Primary and secondary share this implementation; they differ only in
//! endpoint, model and label. The wire shape is the common
//! `POST {base}/embeddings` JSON contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::EmbeddingError;
use super::provider::{Embedding, EmbeddingProvider, l2_normalize};
use crate::constants::validate_embedding_dim;

/// Construction parameters for a [`RemoteEmbedder`].
#[derive(Debug, Clone)]
pub struct RemoteEmbedderConfig {
    pub name: &'static str,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout: Duration,
    pub max_input_chars: usize,
}

/// One hosted embedding endpoint.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    config: RemoteEmbedderConfig,
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(config: RemoteEmbedderConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| EmbeddingError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    fn classify(&self, error: reqwest::Error) -> EmbeddingError {
        if error.is_timeout() {
            return EmbeddingError::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            };
        }
        EmbeddingError::Unavailable {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let input = super::prepare_text(text, self.config.max_input_chars)?;

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&EmbedRequest {
            model: &self.config.model,
            input: [input.as_str()],
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EmbeddingError::RateLimited);
        }
        if status.is_server_error() {
            return Err(EmbeddingError::Unavailable {
                message: format!("upstream returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(EmbeddingError::InvalidInput {
                reason: format!("upstream rejected request with {status}"),
            });
        }

        let body: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::Unavailable {
                    message: format!("malformed embedding response: {e}"),
                })?;

        let mut vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Unavailable {
                message: "embedding response contained no vectors".to_string(),
            })?;

        validate_embedding_dim(vector.len(), self.config.dimensions)?;
        l2_normalize(&mut vector);

        Ok(Embedding {
            vector,
            provider: self.config.name.to_string(),
            model_version: self.config.model.clone(),
        })
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_version(&self) -> &str {
        &self.config.model
    }

    fn name(&self) -> &'static str {
        self.config.name
    }
}

impl std::fmt::Debug for RemoteEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEmbedder")
            .field("name", &self.config.name)
            .field("model", &self.config.model)
            .field("dimensions", &self.config.dimensions)
            .finish()
    }
}
