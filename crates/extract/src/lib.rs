pub mod normalizer;
pub mod parser;
pub mod prompt;
pub mod schema;

pub use normalizer::normalize_entity;
pub use schema::Triplet;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use ingest::Chunk;
use services::{CompletionService, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum triplets requested per chunk.
    pub max_triplets: usize,
    /// Completion budget for one extraction call.
    pub max_tokens: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_triplets: 5,
            max_tokens: 256,
        }
    }
}

pub struct TripletExtractor {
    service: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    config: ExtractionConfig,
}

impl TripletExtractor {
    pub fn new(
        service: Arc<dyn CompletionService>,
        retry: RetryPolicy,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            service,
            retry,
            config,
        }
    }

    /// Extract normalized triplets from one chunk.
    ///
    /// Failures are recoverable per chunk: a service error after retries or
    /// unparseable model output yields an empty set and a warning, never an
    /// error. The overall build is unaffected.
    pub async fn extract(&self, chunk: &Chunk) -> Vec<Triplet> {
        let prompt = prompt::build_triplet_prompt(&chunk.text, self.config.max_triplets);

        let output = match self
            .retry
            .retry("extract_triplets", || {
                self.service.complete(&prompt, self.config.max_tokens)
            })
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    chunk_id = %chunk.chunk_id,
                    error = %e,
                    "Triplet extraction call failed, chunk contributes no relations"
                );
                return Vec::new();
            }
        };

        let parsed = parser::parse_triplets(&output, self.config.max_triplets);
        if parsed.is_empty() {
            warn!(
                chunk_id = %chunk.chunk_id,
                "Model output contained no parseable triplets"
            );
            return Vec::new();
        }

        parsed
            .into_iter()
            .filter_map(|(subject, predicate, object)| {
                let subject = normalize_entity(&subject);
                let object = normalize_entity(&object);
                if subject.is_empty() || object.is_empty() || subject == object {
                    return None;
                }
                Some(Triplet::new(
                    subject,
                    predicate.trim().to_string(),
                    object,
                    chunk.chunk_id.clone(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingest::Document;
    use services::ServiceError;

    struct ScriptedCompletion {
        output: String,
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, _prompt: &str, _max_tokens: usize) -> Result<String, ServiceError> {
            Ok(self.output.clone())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionService for FailingCompletion {
        async fn complete(&self, _prompt: &str, _max_tokens: usize) -> Result<String, ServiceError> {
            Err(ServiceError::Status {
                kind: "completion",
                status: 400,
            })
        }
    }

    fn test_chunk(text: &str) -> Chunk {
        let doc = Document::new(text.to_string(), "test.txt".to_string());
        Chunk::new(doc.id, text.to_string(), (0, text.len()), 0)
    }

    fn extractor(service: Arc<dyn CompletionService>) -> TripletExtractor {
        TripletExtractor::new(service, RetryPolicy::new(0, 1, 1), ExtractionConfig::default())
    }

    #[tokio::test]
    async fn test_extracts_and_normalizes_entities() {
        let service = Arc::new(ScriptedCompletion {
            output: "(New York; is located in; The United States)".to_string(),
        });
        let triplets = extractor(service).extract(&test_chunk("some text")).await;

        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].subject, "new york");
        assert_eq!(triplets[0].object, "the united states");
        assert_eq!(triplets[0].predicate, "is located in");
    }

    #[tokio::test]
    async fn test_unparseable_output_yields_no_triplets() {
        let service = Arc::new(ScriptedCompletion {
            output: "I don't see any facts here.".to_string(),
        });
        let triplets = extractor(service).extract(&test_chunk("some text")).await;

        assert!(triplets.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_is_recoverable() {
        let triplets = extractor(Arc::new(FailingCompletion))
            .extract(&test_chunk("some text"))
            .await;

        assert!(triplets.is_empty());
    }

    #[tokio::test]
    async fn test_self_loops_are_dropped() {
        let service = Arc::new(ScriptedCompletion {
            output: "(Rust; is; rust)\n(Rust; powers; Cargo)".to_string(),
        });
        let triplets = extractor(service).extract(&test_chunk("some text")).await;

        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].object, "cargo");
    }
}
