use crate::index::{AdjacencyGraph, LinearAnnIndex};
use mnemex_core::model::thought_label;

/// Combines the Vector Index and Graph Index behind one surface so the
/// Thought Store can apply a multi-index mutation without juggling two
/// separate lock handles itself (the write lock ordering is still Thought
/// Store → Vector Index → Graph Index at the caller).
pub struct HyperIndex {
    pub vector_index: LinearAnnIndex,
    pub graph_index: AdjacencyGraph,
}

impl HyperIndex {
    pub fn new() -> Self {
        Self {
            vector_index: LinearAnnIndex::new(),
            graph_index: AdjacencyGraph::new(),
        }
    }

    pub fn insert_vector(&mut self, id: u128, embedding: Vec<f32>) {
        self.vector_index.insert(id, embedding);
    }

    pub fn add_node(&mut self, label: impl Into<String>) {
        self.graph_index.add_node(label);
    }

    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        relation: impl Into<String>,
        to: impl Into<String>,
        weight: f32,
    ) {
        self.graph_index.add_edge(from, relation, to, weight);
    }

    /// Removes a thought's vector entry and its `Thought:<id>` node (and all
    /// incident edges) together, satisfying invariant 5.
    pub fn remove_thought(&mut self, id: u128) {
        self.vector_index.remove(id);
        self.graph_index.remove_node(&thought_label(id));
    }

    pub fn search_vector(&self, query: &[f32], k: usize) -> Vec<(u128, f32)> {
        self.vector_index.search(query, k)
    }

    pub fn linked(&self, a: &str, b: &str, max_hops: u8) -> bool {
        self.graph_index.linked(a, b, max_hops)
    }

    pub fn neighbors(&self, label: &str, relations: Option<&[&str]>) -> std::collections::HashSet<String> {
        self.graph_index.neighbors(label, relations)
    }
}

impl Default for HyperIndex {
    fn default() -> Self {
        Self::new()
    }
}
