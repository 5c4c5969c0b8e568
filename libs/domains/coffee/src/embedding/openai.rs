use async_trait::async_trait;
use core_config::{ConfigError, env_optional, env_or_default, env_parse};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::error::{CoffeeResult, SearchError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_DIMENSIONS: usize = 1536;

/// OpenAI-compatible embeddings endpoint
#[derive(Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `None` when `OPENAI_API_KEY` is unset; the gateway then runs lexical-only.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = env_optional("OPENAI_API_KEY") else {
            return Ok(None);
        };

        let dimensions = env_parse("EMBEDDING_DIMENSIONS", DEFAULT_DIMENSIONS)?;
        if dimensions == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_DIMENSIONS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Some(Self {
            api_key,
            base_url: env_or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: env_or_default("EMBEDDING_MODEL", DEFAULT_MODEL),
            dimensions,
        }))
    }
}

/// Embeddings over the OpenAI HTTP API
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed(&self, text: &str) -> CoffeeResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: vec![text],
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Embedding(format!(
                "embedding API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response.json().await?;
        first_embedding(body)
    }
}

fn first_embedding(body: EmbeddingResponse) -> CoffeeResult<Vec<f32>> {
    body.data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .ok_or_else(|| SearchError::Embedding("No embedding returned".to_string()))
}
