use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// The three strategies that emit a cost-accountant event. `MISS` never
/// emits (see `Matchmaker` step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HitStrategy {
    ExactHit,
    SemanticHint,
    EntityHop,
}

/// Emitted to the cost accountant on every non-MISS `smart_lookup` outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHit {
    pub thought_id: String,
    pub strategy: HitStrategy,
    pub estimated_saved_units: f64,
}

/// The cost accountant is an external collaborator named only by interface;
/// this is the in-process reference sink used by tests and the composition
/// root's default wiring.
pub trait CostAccountantSink: Send + Sync {
    fn record(&self, hit: CacheHit);
}

#[derive(Default)]
pub struct InMemoryCostAccountantSink {
    hits: Mutex<Vec<CacheHit>>,
}

impl InMemoryCostAccountantSink {
    pub fn hits(&self) -> Vec<CacheHit> {
        self.hits.lock().expect("cost sink lock poisoned").clone()
    }
}

impl CostAccountantSink for InMemoryCostAccountantSink {
    fn record(&self, hit: CacheHit) {
        self.hits.lock().expect("cost sink lock poisoned").push(hit);
    }
}
