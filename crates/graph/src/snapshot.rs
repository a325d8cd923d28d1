use serde::{Deserialize, Serialize};

/// Serializable read-only view of the graph, sufficient for an external
/// renderer: every entity, every relation, and chunk backreferences.
/// Sorted for deterministic output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub entities: Vec<EntityExport>,
    pub relations: Vec<RelationExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityExport {
    pub name: String,
    pub chunk_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationExport {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub chunk_ids: Vec<String>,
}
