pub mod error;
pub mod ollama;
pub mod retry;

pub use error::ServiceError;
pub use ollama::{OllamaCompletion, OllamaEmbedding, ServiceConfig};
pub use retry::RetryPolicy;

use async_trait::async_trait;

/// External embedding model: text in, fixed-dimension vector out.
/// The dimension must be consistent across all calls within one build.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

/// External language model: prompt in, free text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String, ServiceError>;
}
