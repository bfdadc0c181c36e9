use std::sync::Arc;
use std::time::Instant;

use mnemex_core::audit::{AuditEvent, AuditOperation, AuditOutcome, AuditSink};
use mnemex_core::cost::{CacheHit, CostAccountantSink, HitStrategy};
use mnemex_core::federation::FederationBroker;
use mnemex_core::model::{thought_label, scope_label, Scope, UserContext};
use slm::embedding::Embedder;
use slm::ner::EntityExtractor;
use storage::repo::Repository;

use crate::ranker::TemporalRanker;

/// Fallback recorded on the audit trail when no richer per-request model
/// identity is tracked, mirroring the teacher's own default-model sentinel.
const DEFAULT_EMBEDDING_MODEL_ID: &str = "embedding-default-v1";

/// Outcome of `smart_lookup` (§4.F step 6). `MISS` never carries a payload
/// and never emits a cost-accountant event.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    ExactHit {
        thought_id: u128,
        prompt_text: String,
        reasoning_trace: String,
        final_response: String,
    },
    SemanticHint {
        thought_id: u128,
        reasoning_trace: String,
    },
    EntityHop {
        thought_id: u128,
        reasoning_trace: String,
    },
    Miss,
}

impl LookupResult {
    pub fn is_hit(&self) -> bool {
        !matches!(self, LookupResult::Miss)
    }
}

/// Thresholds and fan-out for the fused query (§10.3). Owned by the
/// composition root; the Matchmaker holds no policy beyond applying them.
#[derive(Debug, Clone, Copy)]
pub struct MatchmakerConfig {
    pub exact_hit_threshold: f32,
    pub semantic_hint_threshold: f32,
    pub graph_boost_beta: f32,
    pub candidate_k: usize,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            exact_hit_threshold: 0.99,
            semantic_hint_threshold: 0.85,
            graph_boost_beta: 0.15,
            candidate_k: 20,
        }
    }
}

struct ScoredCandidate {
    id: u128,
    score: f32,
    created_at: u64,
    reasoning_trace: String,
    prompt_text: String,
    final_response: String,
    entities: std::collections::HashSet<String>,
}

/// Executes the fused vector + graph + time + RBAC query (component F). The
/// heart of the system: every other component exists to feed this one.
pub struct Matchmaker {
    repo: Arc<Repository>,
    broker: FederationBroker,
    ranker: TemporalRanker,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn EntityExtractor>,
    cost_sink: Arc<dyn CostAccountantSink>,
    config: MatchmakerConfig,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl Matchmaker {
    pub fn new(
        repo: Arc<Repository>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn EntityExtractor>,
        cost_sink: Arc<dyn CostAccountantSink>,
        config: MatchmakerConfig,
    ) -> Self {
        Self {
            repo,
            broker: FederationBroker::new(),
            ranker: TemporalRanker::new(),
            embedder,
            extractor,
            cost_sink,
            config,
            audit_sink: None,
        }
    }

    /// Attaches the cost accountant's audit trail, recording one
    /// `AuditOperation::Query` event per `smart_lookup` call. Grounded on
    /// the teacher's own optional `audit_sink` builder on its query engine.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    fn emit_audit_event(&self, event: AuditEvent) {
        if let Some(sink) = &self.audit_sink {
            let _ = sink.record(event);
        }
    }

    fn deadline_passed(deadline: Option<Instant>) -> bool {
        deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// `now` is the caller-supplied wall clock (seconds), threaded explicitly
    /// so decay scoring is deterministic under test, matching how
    /// `CachedThought::age_seconds` already takes `now` rather than reading a
    /// clock internally.
    pub async fn smart_lookup(
        &self,
        query_text: &str,
        ctx: &UserContext,
        now: u64,
        deadline: Option<Instant>,
    ) -> LookupResult {
        let result = self.smart_lookup_inner(query_text, ctx, now, deadline).await;

        let mut event = AuditEvent::new(AuditOperation::Query, AuditOutcome::Succeeded);
        event.model_id = Some(DEFAULT_EMBEDDING_MODEL_ID.to_string());
        event.actor = Some(ctx.user_id.clone());
        event.scope_id = ctx.active_project_id.clone();
        event
            .metadata
            .insert("strategy".to_string(), strategy_label(&result).to_string());
        self.emit_audit_event(event);

        result
    }

    async fn smart_lookup_inner(
        &self,
        query_text: &str,
        ctx: &UserContext,
        now: u64,
        deadline: Option<Instant>,
    ) -> LookupResult {
        if Self::deadline_passed(deadline) {
            return LookupResult::Miss;
        }

        // Step 1: embed. Failure surfaces as MISS after one attempt (no
        // retry on the lookup path, unlike ingest).
        let query_vector = match self.embedder.embed(query_text).await {
            Ok(v) => v,
            Err(_) => return LookupResult::Miss,
        };

        if Self::deadline_passed(deadline) {
            return LookupResult::Miss;
        }

        // Step 2: candidate retrieval.
        let candidates = self
            .repo
            .search_vector(&query_vector, self.config.candidate_k)
            .await;

        if Self::deadline_passed(deadline) {
            return LookupResult::Miss;
        }

        // Step 3: access filter.
        let mut survivors = Vec::new();
        for (id, cosine) in candidates {
            let Some(thought) = self.repo.get(id).await else {
                continue;
            };
            if thought.is_stale || !self.broker.can_read(ctx, &thought) {
                continue;
            }
            // A verbatim repeat of the original prompt is the literal
            // definition of "the same question again": treat it as cosine
            // 1.0 rather than trusting the embedder's bucket width, so a
            // prompt-only query still reaches the same thought its own
            // (prompt + response) ingest vector was built from.
            let cosine = if thought.prompt_text == query_text {
                1.0
            } else {
                cosine
            };
            survivors.push((thought, cosine));
        }

        if survivors.is_empty() {
            return LookupResult::Miss;
        }

        if Self::deadline_passed(deadline) {
            return LookupResult::Miss;
        }

        // Step 4: graph boost.
        let mut scored = Vec::with_capacity(survivors.len());
        for (thought, cosine) in survivors {
            let boost = if let Some(active_project_id) = &ctx.active_project_id {
                let project_label = scope_label(Scope::Project, active_project_id);
                if self
                    .repo
                    .linked(&thought_label(thought.id), &project_label, 2)
                    .await
                {
                    1.0 + self.config.graph_boost_beta
                } else {
                    1.0
                }
            } else {
                1.0
            };

            if Self::deadline_passed(deadline) {
                return LookupResult::Miss;
            }

            // Step 5: decay.
            let score = self.ranker.score(cosine, boost, &thought, now);
            scored.push(ScoredCandidate {
                id: thought.id,
                score,
                created_at: thought.created_at,
                reasoning_trace: thought.reasoning_trace,
                prompt_text: thought.prompt_text,
                final_response: thought.final_response,
                entities: thought.entities,
            });
        }

        // Step 6: classify by best S. Ties: newer `created_at` wins, then
        // lexicographic id.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });

        let best = &scored[0];

        if best.score >= self.config.exact_hit_threshold {
            let result = LookupResult::ExactHit {
                thought_id: best.id,
                prompt_text: best.prompt_text.clone(),
                reasoning_trace: best.reasoning_trace.clone(),
                final_response: best.final_response.clone(),
            };
            self.emit_hit(best.id, HitStrategy::ExactHit);
            return result;
        }

        if best.score >= self.config.semantic_hint_threshold {
            let result = LookupResult::SemanticHint {
                thought_id: best.id,
                reasoning_trace: best.reasoning_trace.clone(),
            };
            self.emit_hit(best.id, HitStrategy::SemanticHint);
            return result;
        }

        // Entity-hop fallback: query entities intersected against each
        // survivor's extracted entities, picking the highest-scoring
        // survivor among those that share at least one.
        let query_entities: std::collections::HashSet<String> = self
            .extractor
            .extract(query_text)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.label())
            .collect();

        if !query_entities.is_empty() {
            if let Some(hop) = scored
                .iter()
                .find(|c| !c.entities.is_disjoint(&query_entities))
            {
                let result = LookupResult::EntityHop {
                    thought_id: hop.id,
                    reasoning_trace: hop.reasoning_trace.clone(),
                };
                self.emit_hit(hop.id, HitStrategy::EntityHop);
                return result;
            }
        }

        LookupResult::Miss
    }

    fn emit_hit(&self, thought_id: u128, strategy: HitStrategy) {
        let estimated_saved_units = match strategy {
            HitStrategy::ExactHit => 1.0,
            HitStrategy::SemanticHint => 0.5,
            HitStrategy::EntityHop => 0.25,
        };
        self.cost_sink.record(CacheHit {
            thought_id: thought_id.to_string(),
            strategy,
            estimated_saved_units,
        });
    }
}

fn strategy_label(result: &LookupResult) -> &'static str {
    match result {
        LookupResult::ExactHit { .. } => "EXACT_HIT",
        LookupResult::SemanticHint { .. } => "SEMANTIC_HINT",
        LookupResult::EntityHop { .. } => "ENTITY_HOP",
        LookupResult::Miss => "MISS",
    }
}
