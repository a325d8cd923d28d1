use std::sync::Arc;
use std::sync::OnceLock;

use anyhow::{Result, bail};
use dashmap::DashMap;
use tracing::debug;

use ingest::Chunk;
use services::{EmbeddingService, RetryPolicy};

/// One stored embedding: owner id maps to the vector, plus the chunk's
/// build ordinal for stable tie-breaking.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub vector: Vec<f32>,
    pub ordinal: usize,
}

/// In-memory embedding index over chunks, with optional entity vectors.
///
/// Vectors are computed once at build time and never mutated; re-indexing a
/// known id is a no-op. Concurrent inserts are keyed by distinct ids with no
/// cross-chunk contention. The first stored vector fixes the embedding
/// dimension for the build.
pub struct EmbeddingIndex {
    service: Arc<dyn EmbeddingService>,
    retry: RetryPolicy,
    chunks: DashMap<String, EmbeddingRecord>,
    entities: DashMap<String, Vec<f32>>,
    dimension: OnceLock<usize>,
}

impl EmbeddingIndex {
    pub fn new(service: Arc<dyn EmbeddingService>, retry: RetryPolicy) -> Self {
        Self {
            service,
            retry,
            chunks: DashMap::new(),
            entities: DashMap::new(),
            dimension: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    pub fn contains_chunk(&self, chunk_id: &str) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    /// Embed a chunk and store its vector. Returns false if the chunk id was
    /// already indexed (no-op). Service errors surface after retries; the
    /// caller decides whether to degrade.
    pub async fn index_chunk(&self, chunk: &Chunk) -> Result<bool> {
        if self.chunks.contains_key(&chunk.chunk_id) {
            debug!(chunk_id = %chunk.chunk_id, "Chunk already indexed, skipping");
            return Ok(false);
        }

        let vector = self
            .retry
            .retry("embed_chunk", || self.service.embed(&chunk.text))
            .await?;
        self.check_dimension(vector.len())?;

        // entry() keeps the first vector if two tasks raced on the same id;
        // a stored vector is never mutated.
        self.chunks
            .entry(chunk.chunk_id.clone())
            .or_insert(EmbeddingRecord {
                vector,
                ordinal: chunk.ordinal,
            });
        Ok(true)
    }

    /// Embed an entity from its mention text. Entities without a vector are
    /// still reachable through graph traversal, so this is optional.
    pub async fn index_entity(&self, name: &str, text: &str) -> Result<bool> {
        if self.entities.contains_key(name) {
            return Ok(false);
        }

        let vector = self
            .retry
            .retry("embed_entity", || self.service.embed(text))
            .await?;
        self.check_dimension(vector.len())?;

        self.entities.entry(name.to_string()).or_insert(vector);
        Ok(true)
    }

    pub fn entity_vector(&self, name: &str) -> Option<Vec<f32>> {
        self.entities.get(name).map(|v| v.clone())
    }

    /// Top-k chunks by cosine similarity to the query vector, sorted by
    /// non-increasing score with ties broken by original chunk order.
    pub fn similar(&self, query: &[f32], top_k: usize) -> Vec<(String, f32)> {
        if query.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(String, f32, usize)> = self
            .chunks
            .iter()
            .filter_map(|entry| {
                let score = cosine_similarity(query, &entry.value().vector)?;
                Some((entry.key().clone(), score, entry.value().ordinal))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(chunk_id, score, _)| (chunk_id, score))
            .collect()
    }

    fn check_dimension(&self, got: usize) -> Result<()> {
        let expected = *self.dimension.get_or_init(|| got);
        if expected != got {
            bail!(
                "embedding dimension changed within one build: expected {}, got {}",
                expected,
                got
            );
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        None
    } else {
        Some(dot / denom)
    }
}
