use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use query::{Answer, HybridRetriever, TreeSummarizer};
use services::{CompletionService, EmbeddingService};

use crate::config::AppConfig;
use crate::pipeline::KnowledgeIndex;

/// Query-time engine over a finished build: hybrid retrieval followed by
/// tree-summarize synthesis. Reads only; never mutates the store.
pub struct QueryEngine {
    retriever: HybridRetriever,
    synthesizer: TreeSummarizer,
}

impl QueryEngine {
    pub fn new(
        knowledge: &KnowledgeIndex,
        embedder: Arc<dyn EmbeddingService>,
        completion: Arc<dyn CompletionService>,
        config: &AppConfig,
    ) -> Self {
        let retriever = HybridRetriever::new(
            knowledge.graph.clone(),
            knowledge.index.clone(),
            knowledge.chunks.clone(),
            embedder,
            config.retry.policy(),
            config.retrieval.clone(),
        );
        let synthesizer = TreeSummarizer::new(
            completion,
            config.retry.policy(),
            config.synthesis.clone(),
        );

        Self {
            retriever,
            synthesizer,
        }
    }

    /// Answer one question. Retrieval degradation is handled internally; a
    /// synthesis failure propagates, since there is no safe partial answer.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let context = self.retriever.retrieve(question).await;
        info!(context_items = context.items.len(), "Synthesizing answer");
        self.synthesizer.synthesize(question, &context).await
    }
}

/// Persist the answer text as a UTF-8 file.
pub async fn save_answer(answer: &Answer, path: &Path) -> Result<()> {
    tokio::fs::write(path, answer.text.as_bytes())
        .await
        .context(format!("Failed to write answer to {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingest::Document;
    use services::ServiceError;

    use crate::pipeline::BuildPipeline;

    struct ScriptedCompletion;

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, prompt: &str, _max_tokens: usize) -> Result<String, ServiceError> {
            // Extraction prompts ask for triplets; synthesis prompts ask for
            // an answer grounded in context.
            if prompt.contains("TRIPLETS:") {
                Ok("(rust; is; a language)".to_string())
            } else {
                Ok("Rust is a language.".to_string())
            }
        }
    }

    struct LengthEmbedding;

    #[async_trait]
    impl EmbeddingService for LengthEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.retry.max_retries = 0;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_ms = 1;
        config
    }

    #[tokio::test]
    async fn test_build_then_answer_end_to_end() {
        let completion: Arc<dyn CompletionService> = Arc::new(ScriptedCompletion);
        let embedder: Arc<dyn EmbeddingService> = Arc::new(LengthEmbedding);
        let config = fast_config();

        let pipeline = BuildPipeline::new(completion.clone(), embedder.clone(), config.clone());
        let docs = vec![Document::new(
            "Rust is a systems language.".to_string(),
            "rust.md".to_string(),
        )];
        let (knowledge, _) = pipeline.build(&docs).await.unwrap();

        let engine = QueryEngine::new(&knowledge, embedder, completion, &config);
        let answer = engine.answer("what is rust").await.unwrap();

        assert_eq!(answer.text, "Rust is a language.");
        assert!(!answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_answer_without_any_context() {
        let completion: Arc<dyn CompletionService> = Arc::new(ScriptedCompletion);
        let embedder: Arc<dyn EmbeddingService> = Arc::new(LengthEmbedding);
        let config = fast_config();

        let pipeline = BuildPipeline::new(completion.clone(), embedder.clone(), config.clone());
        let (knowledge, _) = pipeline.build(&[]).await.unwrap();

        let engine = QueryEngine::new(&knowledge, embedder, completion, &config);
        let answer = engine.answer("what is rust").await.unwrap();

        assert_eq!(answer.text, query::INSUFFICIENT_CONTEXT_ANSWER);
    }

    #[tokio::test]
    async fn test_save_answer_writes_utf8_file() {
        let answer = Answer {
            text: "réponse finale".to_string(),
            sources: Vec::new(),
        };
        let path = std::env::temp_dir().join("kgrag_test_answer.md");

        save_answer(&answer, &path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "réponse finale");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
