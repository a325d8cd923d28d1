use serde::{Deserialize, Serialize};

/// One selected chunk with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub text: String,
    pub score: f32,
}

/// What the retriever did for one query, for logging and inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalTrace {
    pub similarity_hits: usize,
    pub seed_entities: usize,
    pub expanded_entities: usize,
    pub graph_only_chunks: usize,
    pub used_fallback: bool,
}

/// Ordered context selected for one query. Transient; rebuilt per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalContext {
    pub items: Vec<ScoredChunk>,
    pub trace: RetrievalTrace,
}

impl RetrievalContext {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            trace: RetrievalTrace::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Final synthesized answer plus the context that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ScoredChunk>,
}
