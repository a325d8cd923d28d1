use serde::{Deserialize, Serialize};

/// A directed (subject, predicate, object) relation extracted from one
/// chunk. Subject and object are normalized entity names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub chunk_id: String,
}

impl Triplet {
    pub fn new(subject: String, predicate: String, object: String, chunk_id: String) -> Self {
        Self {
            subject,
            predicate,
            object,
            chunk_id,
        }
    }

    /// Identity for idempotent graph insertion: the source chunk is
    /// provenance, not part of the relation's identity.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.subject, &self.predicate, &self.object)
    }
}
