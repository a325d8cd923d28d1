pub mod context;
pub mod retriever;
pub mod synthesizer;

pub use context::{Answer, RetrievalContext, RetrievalTrace, ScoredChunk};
pub use retriever::{HybridRetriever, RetrievalConfig};
pub use synthesizer::{INSUFFICIENT_CONTEXT_ANSWER, SynthesisConfig, TreeSummarizer};
