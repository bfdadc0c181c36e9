use mnemex_core::model::CachedThought;

/// Named so the half-life convention is visibly a decision, not an accident
/// (§9 "the Temporal Ranker takes the convention as a named constant").
pub const DECAY_CONVENTION_HALF_LIFE: &str = "half_life";

/// Applies exponential decay to a vector-similarity score (component E).
/// Carries no policy of its own beyond the formula; per-scope `ttl_seconds`
/// defaults live in `CacheConfig`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalRanker;

impl TemporalRanker {
    pub fn new() -> Self {
        Self
    }

    /// `λ(t) = ln(2) / ttl_seconds` — half-life semantics: relevance halves
    /// every `ttl_seconds`.
    pub fn lambda(&self, thought: &CachedThought) -> f64 {
        std::f64::consts::LN_2 / thought.ttl_seconds.max(1) as f64
    }

    /// `decay = exp(−λ(t) · Δt)`, Δt in seconds, saturating at zero so a
    /// thought timestamped in the future never decays negatively.
    pub fn decay(&self, thought: &CachedThought, now: u64) -> f64 {
        let delta_t = thought.age_seconds(now) as f64;
        (-self.lambda(thought) * delta_t).exp()
    }

    /// `S = S_vector · boost · decay`.
    pub fn score(&self, cosine_similarity: f32, boost: f32, thought: &CachedThought, now: u64) -> f32 {
        cosine_similarity * boost * self.decay(thought, now) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemex_core::model::{Scope, GLOBAL_SCOPE_ID};
    use std::collections::HashSet;

    fn thought(created_at: u64, ttl_seconds: u64) -> CachedThought {
        CachedThought {
            id: 1,
            vector: vec![1.0],
            entities: HashSet::new(),
            scope: Scope::Global,
            scope_id: GLOBAL_SCOPE_ID.to_string(),
            owner_id: "u1".to_string(),
            prompt_text: String::new(),
            reasoning_trace: String::new(),
            final_response: String::new(),
            source_urns: vec![],
            is_stale: false,
            created_at,
            ttl_seconds,
            access_roles: HashSet::new(),
        }
    }

    #[test]
    fn decay_halves_at_one_ttl() {
        let ranker = TemporalRanker::new();
        let t = thought(0, 100);
        let decay = ranker.decay(&t, 100);
        assert!((decay - 0.5).abs() < 1e-9);
    }

    #[test]
    fn decay_is_one_at_creation() {
        let ranker = TemporalRanker::new();
        let t = thought(1_000, 100);
        assert!((ranker.decay(&t, 1_000) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decay_never_negative_for_future_timestamps() {
        let ranker = TemporalRanker::new();
        let t = thought(2_000, 100);
        assert!((ranker.decay(&t, 500) - 1.0).abs() < 1e-9);
    }
}
