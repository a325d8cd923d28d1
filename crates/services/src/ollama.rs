use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CompletionService, EmbeddingService, ServiceError};

/// Connection settings for the model backend, passed explicitly to each
/// client at construction. There is no process-wide model state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub completion_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            completion_model: "llama3".to_string(),
            embedding_model: "bge-m3".to_string(),
            request_timeout_secs: 60,
        }
    }
}

fn build_http_client(config: &ServiceConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

fn classify_send_error(kind: &'static str, url: &str, e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout { kind }
    } else {
        ServiceError::Transport {
            kind,
            url: url.to_string(),
            source: e,
        }
    }
}

#[derive(Clone)]
pub struct OllamaCompletion {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaCompletion {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            model: config.completion_model.clone(),
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl CompletionService for OllamaCompletion {
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String, ServiceError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error("completion", &url, e))?;

        if !response.status().is_success() {
            return Err(ServiceError::Status {
                kind: "completion",
                status: response.status().as_u16(),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse {
                kind: "completion",
                source: e,
            }
        })?;

        Ok(body.response)
    }
}

#[derive(Clone)]
pub struct OllamaEmbedding {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            model: config.embedding_model.clone(),
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error("embedding", &url, e))?;

        if !response.status().is_success() {
            return Err(ServiceError::Status {
                kind: "embedding",
                status: response.status().as_u16(),
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse {
                kind: "embedding",
                source: e,
            }
        })?;

        Ok(body.embedding)
    }
}
