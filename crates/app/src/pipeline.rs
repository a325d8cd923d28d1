use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use extract::TripletExtractor;
use graph::GraphStore;
use index::EmbeddingIndex;
use ingest::{Chunk, Document};
use services::{CompletionService, EmbeddingService};

use crate::config::AppConfig;

/// The queryable result of a build: graph, embedding index, and the chunk
/// texts they reference. Read-only after construction.
pub struct KnowledgeIndex {
    pub graph: Arc<GraphStore>,
    pub index: Arc<EmbeddingIndex>,
    pub chunks: Arc<HashMap<String, Chunk>>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub triplets: usize,
    /// Chunks whose extraction produced nothing (parse or service failure).
    pub chunks_without_triplets: usize,
    /// Chunks excluded from the embedding index after retries. They remain
    /// reachable through graph-only retrieval.
    pub embedding_failures: usize,
}

struct ChunkOutcome {
    triplets: usize,
    embedded: bool,
}

/// Build-time pipeline: chunk documents, then extract and embed each chunk
/// concurrently under a bounded limit.
///
/// Graph insertion is serialized behind a mutex and is idempotent and
/// commutative, so chunks may complete in any order. Per-chunk failures are
/// isolated; a build always completes with whatever succeeded.
pub struct BuildPipeline {
    completion: Arc<dyn CompletionService>,
    embedder: Arc<dyn EmbeddingService>,
    config: AppConfig,
}

impl BuildPipeline {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        embedder: Arc<dyn EmbeddingService>,
        config: AppConfig,
    ) -> Self {
        Self {
            completion,
            embedder,
            config,
        }
    }

    pub async fn build(&self, documents: &[Document]) -> Result<(KnowledgeIndex, BuildReport)> {
        let chunks = ingest::chunk_documents(documents, self.config.chunking.clone());
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Starting knowledge graph build"
        );

        let retry = self.config.retry.policy();
        let graph = Arc::new(Mutex::new(GraphStore::new()));
        let index = Arc::new(EmbeddingIndex::new(self.embedder.clone(), retry.clone()));
        let extractor = Arc::new(TripletExtractor::new(
            self.completion.clone(),
            retry,
            self.config.extraction.clone(),
        ));
        let semaphore = Arc::new(Semaphore::new(
            self.config.concurrency.max_concurrent_chunks.max(1),
        ));

        let mut tasks = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk = chunk.clone();
            let graph = graph.clone();
            let index = index.clone();
            let extractor = extractor.clone();
            let semaphore = semaphore.clone();

            tasks.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    // Semaphore closed means the build was torn down.
                    return ChunkOutcome {
                        triplets: 0,
                        embedded: false,
                    };
                };

                let triplets = extractor.extract(&chunk).await;
                let triplet_count = triplets.len();
                if triplet_count > 0 {
                    let mut store = graph.lock().await;
                    for triplet in triplets {
                        store.add_triplet(triplet);
                    }
                }

                let embedded = match index.index_chunk(&chunk).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(
                            chunk_id = %chunk.chunk_id,
                            error = %e,
                            "Chunk excluded from embedding index"
                        );
                        false
                    }
                };

                ChunkOutcome {
                    triplets: triplet_count,
                    embedded,
                }
            }));
        }

        let mut report = BuildReport {
            documents: documents.len(),
            chunks: chunks.len(),
            ..BuildReport::default()
        };

        for task in tasks {
            match task.await {
                Ok(outcome) => {
                    report.triplets += outcome.triplets;
                    if outcome.triplets == 0 {
                        report.chunks_without_triplets += 1;
                    }
                    if !outcome.embedded {
                        report.embedding_failures += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Chunk task failed");
                    report.chunks_without_triplets += 1;
                    report.embedding_failures += 1;
                }
            }
        }

        let graph = Arc::try_unwrap(graph)
            .map_err(|_| anyhow!("graph store still shared after build"))?
            .into_inner();

        if self.config.embed_entities {
            self.embed_entities(&graph, &index).await;
        }

        info!(
            entities = graph.entity_count(),
            relations = graph.relation_count(),
            indexed_chunks = index.len(),
            triplets = report.triplets,
            "Build complete"
        );

        let chunk_map: HashMap<String, Chunk> = chunks
            .into_iter()
            .map(|c| (c.chunk_id.clone(), c))
            .collect();

        Ok((
            KnowledgeIndex {
                graph: Arc::new(graph),
                index,
                chunks: Arc::new(chunk_map),
            },
            report,
        ))
    }

    /// Optional post-pass: give each entity its own vector. Failures leave
    /// the entity reachable through its source chunks.
    async fn embed_entities(&self, graph: &GraphStore, index: &EmbeddingIndex) {
        for name in graph.entity_names() {
            if let Err(e) = index.index_entity(name, name).await {
                warn!(entity = name, error = %e, "Entity left without embedding");
            }
        }
    }
}
