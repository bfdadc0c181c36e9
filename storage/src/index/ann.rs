use std::collections::HashMap;

/// Stores `(id, vector)` and returns top-k by cosine similarity. Exact
/// brute-force scan; an ANN substitute must document a recall floor of at
/// least 0.9 at k=20 against this implementation.
pub struct LinearAnnIndex {
    embeddings: HashMap<u128, Vec<f32>>,
}

impl LinearAnnIndex {
    pub fn new() -> Self {
        Self {
            embeddings: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: u128, embedding: Vec<f32>) {
        self.embeddings.insert(id, embedding);
    }

    pub fn remove(&mut self, id: u128) -> bool {
        self.embeddings.remove(&id).is_some()
    }

    /// Cosine similarity, descending, truncated to `k`. Vectors are assumed
    /// L2-normalized at write time, so cosine reduces to a dot product, but
    /// this computes the full cosine for correctness regardless of caller
    /// discipline.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(u128, f32)> {
        let mut scores: Vec<(u128, f32)> = self
            .embeddings
            .iter()
            .filter_map(|(id, emb)| cosine_similarity(query, emb).map(|score| (*id, score)))
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);
        scores
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

impl Default for LinearAnnIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some(dot / (norm_a * norm_b))
}
