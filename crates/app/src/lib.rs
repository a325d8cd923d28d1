pub mod config;
pub mod engine;
pub mod pipeline;

pub use config::{AppConfig, ConcurrencyConfig, RetryConfig};
pub use engine::{QueryEngine, save_answer};
pub use pipeline::{BuildPipeline, BuildReport, KnowledgeIndex};
