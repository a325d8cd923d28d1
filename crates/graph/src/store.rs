use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use extract::Triplet;

use crate::snapshot::{EntityExport, GraphSnapshot, RelationExport};

/// Graph node: an entity deduplicated by normalized name, with
/// backreferences to every chunk that mentions it.
#[derive(Debug, Clone)]
pub struct EntityNode {
    pub name: String,
    pub chunk_ids: BTreeSet<String>,
}

/// Graph edge: a predicate between two entities, tagged with every chunk
/// the relation was extracted from.
#[derive(Debug, Clone)]
pub struct RelationEdge {
    pub predicate: String,
    pub chunk_ids: BTreeSet<String>,
}

/// In-memory directed multigraph of entities and relations.
///
/// Edges are stored directed with a predicate label but traversed as
/// undirected for retrieval. Insertion is idempotent and commutative:
/// re-inserting an identical (subject, predicate, object) only accumulates
/// chunk provenance, and insertion order does not affect the resulting
/// graph contents.
pub struct GraphStore {
    graph: DiGraph<EntityNode, RelationEdge>,
    node_by_name: HashMap<String, NodeIndex>,
    chunk_entities: BTreeMap<String, BTreeSet<String>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_by_name: HashMap::new(),
            chunk_entities: BTreeMap::new(),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains_entity(&self, name: &str) -> bool {
        self.node_by_name.contains_key(name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.node_by_name.keys().map(|s| s.as_str())
    }

    /// Idempotent upsert of one extracted triplet.
    pub fn add_triplet(&mut self, triplet: Triplet) {
        let subject_idx = self.ensure_entity(&triplet.subject, &triplet.chunk_id);
        let object_idx = self.ensure_entity(&triplet.object, &triplet.chunk_id);

        let existing = self
            .graph
            .edges_connecting(subject_idx, object_idx)
            .find(|edge| edge.weight().predicate == triplet.predicate)
            .map(|edge| edge.id());

        match existing {
            Some(edge_id) => {
                if let Some(edge) = self.graph.edge_weight_mut(edge_id) {
                    edge.chunk_ids.insert(triplet.chunk_id);
                }
            }
            None => {
                let mut chunk_ids = BTreeSet::new();
                chunk_ids.insert(triplet.chunk_id);
                self.graph.add_edge(
                    subject_idx,
                    object_idx,
                    RelationEdge {
                        predicate: triplet.predicate,
                        chunk_ids,
                    },
                );
            }
        }
    }

    fn ensure_entity(&mut self, name: &str, chunk_id: &str) -> NodeIndex {
        let idx = match self.node_by_name.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(EntityNode {
                    name: name.to_string(),
                    chunk_ids: BTreeSet::new(),
                });
                self.node_by_name.insert(name.to_string(), idx);
                idx
            }
        };

        self.graph[idx].chunk_ids.insert(chunk_id.to_string());
        self.chunk_entities
            .entry(chunk_id.to_string())
            .or_default()
            .insert(name.to_string());

        idx
    }

    /// Entities reachable from `name` within `depth` hops, following edges
    /// in both directions. The seed itself is not included; depth 0 yields
    /// an empty set.
    pub fn neighbors(&self, name: &str, depth: usize) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        let Some(&start) = self.node_by_name.get(name) else {
            return found;
        };
        if depth == 0 {
            return found;
        }

        let mut visited: BTreeSet<NodeIndex> = BTreeSet::new();
        visited.insert(start);
        let mut frontier: VecDeque<(NodeIndex, usize)> = VecDeque::new();
        frontier.push_back((start, 0));

        while let Some((idx, dist)) = frontier.pop_front() {
            if dist == depth {
                continue;
            }
            for neighbor in self.graph.neighbors_undirected(idx) {
                if visited.insert(neighbor) {
                    found.insert(self.graph[neighbor].name.clone());
                    frontier.push_back((neighbor, dist + 1));
                }
            }
        }

        found
    }

    /// All relations incident to an entity, in either direction.
    pub fn relations_for(&self, name: &str) -> Vec<RelationExport> {
        let Some(&idx) = self.node_by_name.get(name) else {
            return Vec::new();
        };

        let mut relations = Vec::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, direction) {
                // A self-loop would appear once per direction; the store
                // never creates self-loops, so no dedup is needed here.
                relations.push(RelationExport {
                    subject: self.graph[edge.source()].name.clone(),
                    predicate: edge.weight().predicate.clone(),
                    object: self.graph[edge.target()].name.clone(),
                    chunk_ids: edge.weight().chunk_ids.iter().cloned().collect(),
                });
            }
        }

        relations.sort();
        relations
    }

    /// Chunk ids that mention an entity.
    pub fn chunks_for(&self, name: &str) -> BTreeSet<String> {
        match self.node_by_name.get(name) {
            Some(&idx) => self.graph[idx].chunk_ids.clone(),
            None => BTreeSet::new(),
        }
    }

    /// Entities mentioned in a chunk.
    pub fn entities_in_chunk(&self, chunk_id: &str) -> BTreeSet<String> {
        self.chunk_entities
            .get(chunk_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Read-only export of the full graph for external rendering.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut entities: Vec<EntityExport> = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                EntityExport {
                    name: node.name.clone(),
                    chunk_ids: node.chunk_ids.iter().cloned().collect(),
                }
            })
            .collect();
        entities.sort();

        let mut relations: Vec<RelationExport> = self
            .graph
            .edge_references()
            .map(|edge| RelationExport {
                subject: self.graph[edge.source()].name.clone(),
                predicate: edge.weight().predicate.clone(),
                object: self.graph[edge.target()].name.clone(),
                chunk_ids: edge.weight().chunk_ids.iter().cloned().collect(),
            })
            .collect();
        relations.sort();

        GraphSnapshot {
            entities,
            relations,
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
