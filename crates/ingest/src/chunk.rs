use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A source document: raw text plus where it came from. Immutable once
/// loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source: String,
}

impl Document {
    pub fn new(text: String, source: String) -> Self {
        let id = crate::generate_doc_id(&source);
        Self { id, text, source }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub text: String,
    pub span: (usize, usize), // [start, end) byte positions in the document
    /// Position in build order, used as a stable tie-breaker at query time.
    pub ordinal: usize,
}

impl Chunk {
    pub fn new(doc_id: String, text: String, span: (usize, usize), ordinal: usize) -> Self {
        let chunk_id = Self::generate_chunk_id(&doc_id, &text, span);

        Self {
            chunk_id,
            doc_id,
            text,
            span,
            ordinal,
        }
    }

    fn generate_chunk_id(doc_id: &str, text: &str, span: (usize, usize)) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(text.as_bytes());
        hasher.update(span.0.to_string().as_bytes());
        hasher.update(span.1.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16]) // Use first 16 bytes (32 hex chars)
    }
}
