pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::{Chunk, Document};
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::FileReader;

use sha2::{Digest, Sha256};

/// Generate a stable document ID from the source path.
pub fn generate_doc_id(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Chunk a set of documents in order, assigning build-global ordinals.
pub fn chunk_documents(documents: &[Document], config: ChunkerConfig) -> Vec<Chunk> {
    let chunker = Chunker::new(config);
    let mut all_chunks = Vec::new();

    for doc in documents {
        all_chunks.extend(chunker.chunk(doc));
    }

    for (ordinal, chunk) in all_chunks.iter_mut().enumerate() {
        chunk.ordinal = ordinal;
    }

    all_chunks
}
