use std::collections::{HashMap, HashSet, VecDeque};

/// `(target_label, relation, weight)`.
pub type EdgeData = (String, String, f32);

/// Typed nodes and labeled edges, keyed by label (`Thought:<id>`,
/// `User:<id>`, `<Type>:<Name>`, ...). `add_node`/`add_edge` are idempotent;
/// `linked` ignores edge direction (reachability, not traversal order).
#[derive(Clone, Debug, Default)]
pub struct AdjacencyGraph {
    nodes: HashSet<String>,
    /// Outgoing edges only. Incoming neighbors for a label are derived by
    /// scanning values — acceptable at this scale; see `incoming_of`.
    adjacency: HashMap<String, Vec<EdgeData>>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, label: impl Into<String>) {
        self.nodes.insert(label.into());
    }

    /// Idempotent: inserting an existing `(from, relation, to)` triple is a
    /// no-op. Implicitly adds both endpoints as nodes.
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        relation: impl Into<String>,
        to: impl Into<String>,
        weight: f32,
    ) {
        let from = from.into();
        let relation = relation.into();
        let to = to.into();

        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());

        let edges = self.adjacency.entry(from).or_default();
        if edges.iter().any(|(t, r, _)| *t == to && *r == relation) {
            return;
        }
        edges.push((to, relation, weight));
    }

    pub fn remove_node(&mut self, label: &str) -> bool {
        let existed = self.nodes.remove(label);
        self.adjacency.remove(label);
        for edges in self.adjacency.values_mut() {
            edges.retain(|(t, _, _)| t != label);
        }
        existed
    }

    pub fn contains_node(&self, label: &str) -> bool {
        self.nodes.contains(label)
    }

    fn incoming_of(&self, label: &str) -> Vec<(String, String, f32)> {
        let mut out = Vec::new();
        for (source, edges) in &self.adjacency {
            for (target, relation, weight) in edges {
                if target == label {
                    out.push((source.clone(), relation.clone(), *weight));
                }
            }
        }
        out
    }

    /// One-hop neighbors, direction-agnostic, optionally filtered to a set
    /// of relation types.
    pub fn neighbors(&self, label: &str, relations: Option<&[&str]>) -> HashSet<String> {
        let mut out = HashSet::new();
        if let Some(edges) = self.adjacency.get(label) {
            for (target, relation, _) in edges {
                if relations.map(|rs| rs.contains(&relation.as_str())).unwrap_or(true) {
                    out.insert(target.clone());
                }
            }
        }
        for (source, relation, _) in self.incoming_of(label) {
            if relations.map(|rs| rs.contains(&relation.as_str())).unwrap_or(true) {
                out.insert(source);
            }
        }
        out
    }

    fn undirected_neighbors(&self, label: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .adjacency
            .get(label)
            .map(|edges| edges.iter().map(|(t, _, _)| t.clone()).collect())
            .unwrap_or_default();
        out.extend(self.incoming_of(label).into_iter().map(|(s, _, _)| s));
        out
    }

    /// Reachability within `max_hops`, ignoring edge direction. Used by the
    /// graph-boost rule in the scoring pipeline.
    pub fn linked(&self, a: &str, b: &str, max_hops: u8) -> bool {
        if a == b {
            return true;
        }
        if max_hops == 0 {
            return false;
        }

        let mut visited = HashSet::new();
        visited.insert(a.to_string());
        let mut frontier = vec![a.to_string()];

        for _ in 0..max_hops {
            let mut next = Vec::new();
            for node in &frontier {
                for neighbor in self.undirected_neighbors(node) {
                    if neighbor == b {
                        return true;
                    }
                    if visited.insert(neighbor.clone()) {
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }
        false
    }

    /// BFS expansion used by the ingestion/entity-linking paths that need
    /// distances, not just a boolean. Direction-agnostic like `linked`.
    pub fn expand(&self, start_label: &str, max_hops: u8) -> Vec<(String, u8)> {
        if max_hops == 0 {
            return vec![];
        }

        let mut visited = HashSet::new();
        visited.insert(start_label.to_string());
        let mut queue = VecDeque::new();
        queue.push_back((start_label.to_string(), 0u8));

        let mut result = Vec::new();
        while let Some((curr, dist)) = queue.pop_front() {
            if dist >= max_hops {
                continue;
            }
            for neighbor in self.undirected_neighbors(&curr) {
                if visited.insert(neighbor.clone()) {
                    result.push((neighbor.clone(), dist + 1));
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }
        result
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_labels(&self) -> Vec<String> {
        let mut out: Vec<String> = self.nodes.iter().cloned().collect();
        out.sort();
        out
    }

    pub fn edges(&self) -> Vec<(String, String, String, f32)> {
        let mut out = Vec::new();
        for (source, edges) in &self.adjacency {
            for (target, relation, weight) in edges {
                out.push((source.clone(), relation.clone(), target.clone(), *weight));
            }
        }
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_is_idempotent() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge("Thought:1", "CREATED", "User:u1", 1.0);
        graph.add_edge("Thought:1", "CREATED", "User:u1", 1.0);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn neighbors_is_one_hop_and_direction_agnostic() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge("Thought:1", "CREATED", "User:u1", 1.0);

        let from_source = graph.neighbors("Thought:1", None);
        let from_target = graph.neighbors("User:u1", None);
        assert!(from_source.contains("User:u1"));
        assert!(from_target.contains("Thought:1"));
    }

    #[test]
    fn linked_respects_max_hops() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge("A", "RELATED_TO", "B", 1.0);
        graph.add_edge("B", "RELATED_TO", "C", 1.0);

        assert!(graph.linked("A", "C", 2));
        assert!(!graph.linked("A", "C", 1));
    }

    #[test]
    fn linked_ignores_edge_direction() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge("Thought:1", "BELONGS_TO", "Project:apollo", 1.0);

        assert!(graph.linked("Thought:1", "Project:apollo", 2));
        assert!(graph.linked("Project:apollo", "Thought:1", 2));
    }

    #[test]
    fn remove_node_deletes_incident_edges() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge("A", "RELATED_TO", "B", 1.0);
        graph.add_edge("C", "RELATED_TO", "A", 1.0);

        assert!(graph.remove_node("A"));
        assert!(graph.neighbors("B", None).is_empty());
        assert!(graph.neighbors("C", None).is_empty());
        assert!(!graph.contains_node("A"));
    }

    #[test]
    fn add_node_without_edges_is_tracked() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node("Thought:1");
        assert!(graph.contains_node("Thought:1"));
        assert_eq!(graph.node_count(), 1);
    }
}
