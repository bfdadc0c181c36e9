use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Per-strategy lookup counters, tracked separately so `hit_rate` can be
/// decomposed by EXACT_HIT / SEMANTIC_HINT / ENTITY_HOP / MISS, not just
/// hit-vs-miss.
#[derive(Debug, Clone, Default)]
pub struct LookupMetrics {
    pub total_lookups: u64,
    pub exact_hits: u64,
    pub semantic_hints: u64,
    pub entity_hops: u64,
    pub misses: u64,
    pub latencies: VecDeque<u64>, // microseconds
}

#[derive(Debug, Clone, Default)]
pub struct IngestMetrics {
    pub total_ingests: u64,
    pub total_extractions: u64,
    pub total_extraction_confidence: f32,
}

pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    lookup: LookupMetrics,
    ingest: IngestMetrics,
    max_history: usize,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                lookup: LookupMetrics::default(),
                ingest: IngestMetrics::default(),
                max_history,
            })),
        }
    }

    pub fn record_lookup(&self, latency_us: u64, strategy: LookupOutcome) {
        let mut state = self.state.lock().unwrap();
        state.lookup.total_lookups += 1;
        match strategy {
            LookupOutcome::ExactHit => state.lookup.exact_hits += 1,
            LookupOutcome::SemanticHint => state.lookup.semantic_hints += 1,
            LookupOutcome::EntityHop => state.lookup.entity_hops += 1,
            LookupOutcome::Miss => state.lookup.misses += 1,
        }
        state.lookup.latencies.push_back(latency_us);
        if state.lookup.latencies.len() > state.max_history {
            state.lookup.latencies.pop_front();
        }
    }

    pub fn record_ingest(&self) {
        let mut state = self.state.lock().unwrap();
        state.ingest.total_ingests += 1;
    }

    pub fn record_extraction(&self, avg_confidence: f32) {
        let mut state = self.state.lock().unwrap();
        state.ingest.total_extractions += 1;
        state.ingest.total_extraction_confidence += avg_confidence;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().unwrap();
        let l = &state.lookup;
        let i = &state.ingest;

        let mut sorted_latencies: Vec<u64> = l.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        let p50 = percentile(&sorted_latencies, 50.0);
        let p95 = percentile(&sorted_latencies, 95.0);
        let p99 = percentile(&sorted_latencies, 99.0);

        let non_miss = l.exact_hits + l.semantic_hints + l.entity_hops;
        let hit_rate = if l.total_lookups > 0 {
            non_miss as f32 / l.total_lookups as f32
        } else {
            0.0
        };

        let avg_extraction_confidence = if i.total_extractions > 0 {
            i.total_extraction_confidence / i.total_extractions as f32
        } else {
            0.0
        };

        MetricsSnapshot {
            total_lookups: l.total_lookups,
            total_ingests: i.total_ingests,
            hit_rate,
            p50,
            p95,
            p99,
            history_count: l.latencies.len(),
            avg_extraction_confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    ExactHit,
    SemanticHint,
    EntityHop,
    Miss,
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_lookups: u64,
    pub total_ingests: u64,
    pub hit_rate: f32,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
    pub avg_extraction_confidence: f32,
}
