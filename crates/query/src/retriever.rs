use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use graph::GraphStore;
use index::EmbeddingIndex;
use ingest::Chunk;
use services::{EmbeddingService, RetryPolicy};

use crate::context::{RetrievalContext, RetrievalTrace, ScoredChunk};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many chunks similarity search contributes.
    pub top_k: usize,
    /// Hops of graph-neighborhood expansion around seed entities.
    pub neighbor_depth: usize,
    /// Score assigned to chunks that arrive only via graph expansion. Kept
    /// below typical similarity scores so expansion supplements rather than
    /// dominates.
    pub expansion_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            neighbor_depth: 1,
            expansion_weight: 0.3,
        }
    }
}

/// Combines embedding similarity with graph-neighborhood expansion to
/// assemble the context for a query.
pub struct HybridRetriever {
    graph: Arc<GraphStore>,
    index: Arc<EmbeddingIndex>,
    chunks: Arc<HashMap<String, Chunk>>,
    embedder: Arc<dyn EmbeddingService>,
    retry: RetryPolicy,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        graph: Arc<GraphStore>,
        index: Arc<EmbeddingIndex>,
        chunks: Arc<HashMap<String, Chunk>>,
        embedder: Arc<dyn EmbeddingService>,
        retry: RetryPolicy,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            graph,
            index,
            chunks,
            embedder,
            retry,
            config,
        }
    }

    /// Retrieve context for a query.
    ///
    /// Steps: embed the query, take the top-k similar chunks, seed entities
    /// from those chunks, expand one neighborhood ring in the graph, and pull
    /// in every chunk mentioning a seed or neighbor at a fixed lower score.
    /// Duplicates keep the higher score. If embedding fails, retrieval
    /// degrades to graph-only traversal seeded by entity names matched in
    /// the query text; an empty result is a valid outcome, not an error.
    pub async fn retrieve(&self, query: &str) -> RetrievalContext {
        let mut scores: HashMap<String, f32> = HashMap::new();
        let mut trace = RetrievalTrace::default();

        let seeds: BTreeSet<String> = match self
            .retry
            .retry("embed_query", || self.embedder.embed(query))
            .await
        {
            Ok(query_vector) => {
                let hits = self.index.similar(&query_vector, self.config.top_k);
                trace.similarity_hits = hits.len();

                if hits.is_empty() {
                    // Nothing indexed (or all embeddings degraded at build
                    // time); the graph may still hold retrievable content.
                    trace.used_fallback = true;
                    self.match_entities_in_query(query)
                } else {
                    let mut seeds = BTreeSet::new();
                    for (chunk_id, score) in hits {
                        seeds.extend(self.graph.entities_in_chunk(&chunk_id));
                        scores.insert(chunk_id, score);
                    }
                    seeds
                }
            }
            Err(e) => {
                warn!(error = %e, "Query embedding failed, using graph-only retrieval");
                trace.used_fallback = true;
                self.match_entities_in_query(query)
            }
        };
        trace.seed_entities = seeds.len();

        let mut expanded = seeds.clone();
        for seed in &seeds {
            expanded.extend(self.graph.neighbors(seed, self.config.neighbor_depth));
        }
        trace.expanded_entities = expanded.len();

        for entity in &expanded {
            for chunk_id in self.graph.chunks_for(entity) {
                match scores.get_mut(&chunk_id) {
                    Some(existing) => {
                        if self.config.expansion_weight > *existing {
                            *existing = self.config.expansion_weight;
                        }
                    }
                    None => {
                        scores.insert(chunk_id, self.config.expansion_weight);
                        trace.graph_only_chunks += 1;
                    }
                }
            }
        }

        let mut ranked: Vec<(ScoredChunk, usize)> = scores
            .into_iter()
            .filter_map(|(chunk_id, score)| {
                let chunk = self.chunks.get(&chunk_id)?;
                Some((
                    ScoredChunk {
                        chunk_id,
                        text: chunk.text.clone(),
                        score,
                    },
                    chunk.ordinal,
                ))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.score.total_cmp(&a.0.score).then(a.1.cmp(&b.1)));

        info!(
            similarity_hits = trace.similarity_hits,
            seed_entities = trace.seed_entities,
            expanded_entities = trace.expanded_entities,
            graph_only_chunks = trace.graph_only_chunks,
            used_fallback = trace.used_fallback,
            "Retrieval complete"
        );

        RetrievalContext {
            items: ranked.into_iter().map(|(item, _)| item).collect(),
            trace,
        }
    }

    /// Fallback seeding: entity names found by substring match in the query.
    fn match_entities_in_query(&self, query: &str) -> BTreeSet<String> {
        let query_lower = query.to_lowercase();
        self.graph
            .entity_names()
            .filter(|name| query_lower.contains(*name))
            .map(|name| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use extract::Triplet;
    use services::ServiceError;

    struct TableEmbedding {
        table: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingService for TableEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
            self.table.get(text).cloned().ok_or(ServiceError::Status {
                kind: "embedding",
                status: 400,
            })
        }
    }

    struct FailingEmbedding;

    #[async_trait]
    impl EmbeddingService for FailingEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
            Err(ServiceError::Status {
                kind: "embedding",
                status: 400,
            })
        }
    }

    fn chunk(text: &str, ordinal: usize) -> Chunk {
        Chunk::new("doc".to_string(), text.to_string(), (0, text.len()), ordinal)
    }

    fn triplet(s: &str, p: &str, o: &str, chunk_id: &str) -> Triplet {
        Triplet::new(
            s.to_string(),
            p.to_string(),
            o.to_string(),
            chunk_id.to_string(),
        )
    }

    struct Fixture {
        graph: Arc<GraphStore>,
        index: Arc<EmbeddingIndex>,
        chunks: Arc<HashMap<String, Chunk>>,
    }

    /// Two isolated clusters: chunks about Rust (entities rust/cargo) and a
    /// chunk about cooking (entities flour/bread), with orthogonal vectors.
    async fn clustered_fixture() -> Fixture {
        let rust_chunk = chunk("rust ships with cargo", 0);
        let rust_chunk2 = chunk("cargo builds rust crates", 1);
        let cooking_chunk = chunk("flour becomes bread", 2);

        let mut graph = GraphStore::new();
        graph.add_triplet(triplet("rust", "ships with", "cargo", &rust_chunk.chunk_id));
        graph.add_triplet(triplet("cargo", "builds", "crates", &rust_chunk2.chunk_id));
        graph.add_triplet(triplet("flour", "becomes", "bread", &cooking_chunk.chunk_id));

        let embedder = Arc::new(TableEmbedding {
            table: [
                ("rust ships with cargo".to_string(), vec![1.0, 0.0]),
                ("cargo builds rust crates".to_string(), vec![0.9, 0.1]),
                ("flour becomes bread".to_string(), vec![0.0, 1.0]),
            ]
            .into_iter()
            .collect(),
        });
        let index = EmbeddingIndex::new(embedder, RetryPolicy::new(0, 1, 1));
        index.index_chunk(&rust_chunk).await.unwrap();
        index.index_chunk(&rust_chunk2).await.unwrap();
        index.index_chunk(&cooking_chunk).await.unwrap();

        let chunks: HashMap<String, Chunk> = [&rust_chunk, &rust_chunk2, &cooking_chunk]
            .into_iter()
            .map(|c| (c.chunk_id.clone(), c.clone()))
            .collect();

        Fixture {
            graph: Arc::new(graph),
            index: Arc::new(index),
            chunks: Arc::new(chunks),
        }
    }

    fn retriever(
        fixture: &Fixture,
        embedder: Arc<dyn EmbeddingService>,
        config: RetrievalConfig,
    ) -> HybridRetriever {
        HybridRetriever::new(
            fixture.graph.clone(),
            fixture.index.clone(),
            fixture.chunks.clone(),
            embedder,
            RetryPolicy::new(0, 1, 1),
            config,
        )
    }

    #[tokio::test]
    async fn test_matching_cluster_ranks_first() {
        let fixture = clustered_fixture().await;
        let embedder = Arc::new(TableEmbedding {
            table: [("what is rust".to_string(), vec![1.0, 0.0])]
                .into_iter()
                .collect(),
        });

        let context = retriever(&fixture, embedder, RetrievalConfig::default())
            .retrieve("what is rust")
            .await;

        assert!(!context.is_empty());
        assert!(context.items[0].text.contains("rust"));
        let cooking_rank = context
            .items
            .iter()
            .position(|i| i.text.contains("flour"));
        // The unrelated cluster is either absent or ranked below both rust chunks.
        if let Some(rank) = cooking_rank {
            assert!(rank >= 2);
        }
    }

    #[tokio::test]
    async fn test_graph_expansion_supplements_similarity() {
        let fixture = clustered_fixture().await;
        let embedder = Arc::new(TableEmbedding {
            table: [("what is rust".to_string(), vec![1.0, 0.0])]
                .into_iter()
                .collect(),
        });
        // top_k = 1: only the closest chunk comes from similarity; the chunk
        // sharing the "cargo" entity must arrive through graph expansion.
        let config = RetrievalConfig {
            top_k: 1,
            ..RetrievalConfig::default()
        };

        let context = retriever(&fixture, embedder, config)
            .retrieve("what is rust")
            .await;

        assert_eq!(context.trace.similarity_hits, 1);
        assert!(context.trace.graph_only_chunks >= 1);
        assert!(
            context
                .items
                .iter()
                .any(|i| i.text == "cargo builds rust crates")
        );
        // Direct similarity hit outranks the graph-expanded chunk.
        assert_eq!(context.items[0].text, "rust ships with cargo");
    }

    #[tokio::test]
    async fn test_fallback_uses_entity_names_from_query() {
        let fixture = clustered_fixture().await;

        let context = retriever(
            &fixture,
            Arc::new(FailingEmbedding),
            RetrievalConfig::default(),
        )
        .retrieve("tell me about Rust")
        .await;

        assert!(context.trace.used_fallback);
        assert!(!context.is_empty());
        assert!(context.items.iter().all(|i| !i.text.contains("flour")));
    }

    #[tokio::test]
    async fn test_fallback_without_match_is_empty() {
        let fixture = clustered_fixture().await;

        let context = retriever(
            &fixture,
            Arc::new(FailingEmbedding),
            RetrievalConfig::default(),
        )
        .retrieve("completely unrelated question")
        .await;

        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_chunks_keep_higher_score() {
        let fixture = clustered_fixture().await;
        let embedder = Arc::new(TableEmbedding {
            table: [("what is rust".to_string(), vec![1.0, 0.0])]
                .into_iter()
                .collect(),
        });

        let context = retriever(&fixture, embedder, RetrievalConfig::default())
            .retrieve("what is rust")
            .await;

        // The top similarity hit also arrives via expansion; its similarity
        // score (≈1.0) must survive the merge.
        assert!(context.items[0].score > 0.9);
        let mut seen = std::collections::HashSet::new();
        assert!(context.items.iter().all(|i| seen.insert(i.chunk_id.clone())));
    }
}
