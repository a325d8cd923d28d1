use serde::{Deserialize, Serialize};

use extract::ExtractionConfig;
use ingest::ChunkerConfig;
use query::{RetrievalConfig, SynthesisConfig};
use services::{RetryPolicy, ServiceConfig};

/// Complete configuration for one build-then-query session, passed
/// explicitly to each component at construction. There is no process-wide
/// mutable state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub chunking: ChunkerConfig,
    pub extraction: ExtractionConfig,
    pub retrieval: RetrievalConfig,
    pub synthesis: SynthesisConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub service: ServiceConfig,
    /// Also embed entity names at build time. Retrieval works without this;
    /// entities then contribute through their source chunks only.
    pub embed_entities: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Chunks processed concurrently during a build. Bounds pressure on the
    /// external model services.
    pub max_concurrent_chunks: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_chunks: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            self.initial_backoff_ms,
            self.max_backoff_ms,
        )
    }
}
