//! Composition root (§9 "Global state"). Wires the three indices behind
//! `storage::Repository`, the fused query path, the ingest pipeline, and
//! the relocation manager into a single handle, all constructed once at
//! startup rather than reached for as an ambient singleton.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ingestion::{
    IngestionConfig, IngestionError, IngestionPipeline, RelocationError, RelocationManager,
    RelocationSummary,
};
use jobs::{ChannelTaskRunner, TaskRunner};
use mnemex_core::audit::AuditSink;
use mnemex_core::auth::{RoleUpdate, SourceUpdated};
use mnemex_core::config::{AppConfig, CacheConfig};
use mnemex_core::cost::CostAccountantSink;
use mnemex_core::model::{Scope, UserContext};
use mnemex_core::request::AddThoughtRequest;
use mnemex_core::sanitize::SanitizationPolicy;
use query::{LookupResult, Matchmaker, MatchmakerConfig};
use slm::embedding::Embedder;
use slm::ner::EntityExtractor;
use storage::repo::{RepoError, Repository};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineBuildError {
    #[error(transparent)]
    Storage(#[from] RepoError),
}

/// The handles a caller plugs in at startup for the capability contracts
/// the engine depends on (§9 "Polymorphism over strategies"). Swapping any
/// one of these for a production implementation never touches the engine
/// itself.
pub struct EngineDependencies {
    pub embedder: Arc<dyn Embedder>,
    pub extractor: Arc<dyn EntityExtractor>,
    pub cost_sink: Arc<dyn CostAccountantSink>,
    pub sanitization_policy: Arc<dyn SanitizationPolicy>,
    pub task_runner: Arc<dyn TaskRunner>,
    pub audit_sink: Option<Arc<dyn AuditSink>>,
}

impl EngineDependencies {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn EntityExtractor>,
        cost_sink: Arc<dyn CostAccountantSink>,
        sanitization_policy: Arc<dyn SanitizationPolicy>,
    ) -> Self {
        Self {
            embedder,
            extractor,
            cost_sink,
            sanitization_policy,
            task_runner: Arc::new(ChannelTaskRunner::new(256)),
            audit_sink: None,
        }
    }

    pub fn with_task_runner(mut self, task_runner: Arc<dyn TaskRunner>) -> Self {
        self.task_runner = task_runner;
        self
    }

    /// Plugs the cost accountant's audit trail into every component that
    /// emits an `AuditEvent` (ingestion, the matchmaker, relocation).
    pub fn with_audit_sink(mut self, audit_sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(audit_sink);
        self
    }
}

fn matchmaker_config(cache: &CacheConfig) -> MatchmakerConfig {
    MatchmakerConfig {
        exact_hit_threshold: cache.exact_hit_threshold,
        semantic_hint_threshold: cache.semantic_hint_threshold,
        graph_boost_beta: cache.graph_boost_beta,
        candidate_k: cache.candidate_k,
    }
}

/// Translates `CacheConfig`'s string-keyed per-scope `ttl_seconds` defaults
/// into the `IngestionConfig` the pipeline actually consults, falling back
/// to `cache.default_ttl_for(GLOBAL)` for any scope left unconfigured.
fn ingestion_config(cache: &CacheConfig) -> IngestionConfig {
    let scope_ttl_seconds = [
        Scope::User,
        Scope::Project,
        Scope::Department,
        Scope::Client,
        Scope::Global,
    ]
    .into_iter()
    .filter_map(|scope| {
        cache
            .default_ttl_seconds
            .get(scope.as_str())
            .map(|ttl| (scope, *ttl))
    })
    .collect();

    IngestionConfig {
        scope_ttl_seconds,
        default_ttl_seconds: cache.default_ttl_for(Scope::Global),
        ..IngestionConfig::default()
    }
}

/// The one object a caller needs: every read/write path the spec names,
/// already wired to one shared `Repository`.
pub struct MnemexEngine {
    repo: Arc<Repository>,
    ingestion: IngestionPipeline,
    relocation: RelocationManager,
    matchmaker: Matchmaker,
}

impl MnemexEngine {
    /// Builds the engine from a data directory and an already-loaded
    /// configuration (see `mnemex_core::config::AppConfig::load`), plugging
    /// in the caller-supplied capability implementations.
    pub async fn open(
        data_dir: impl AsRef<Path>,
        config: &AppConfig,
        deps: EngineDependencies,
    ) -> Result<Self, EngineBuildError> {
        let repo = Arc::new(Repository::open(data_dir).await?);

        let mut ingestion = IngestionPipeline::with_config(
            repo.clone(),
            deps.embedder.clone(),
            deps.extractor.clone(),
            deps.task_runner.clone(),
            ingestion_config(&config.cache),
        );
        let mut relocation = RelocationManager::new(repo.clone(), deps.sanitization_policy.clone());
        let mut matchmaker = Matchmaker::new(
            repo.clone(),
            deps.embedder,
            deps.extractor,
            deps.cost_sink,
            matchmaker_config(&config.cache),
        );

        if let Some(audit_sink) = deps.audit_sink {
            ingestion = ingestion.with_audit_sink(audit_sink.clone());
            relocation = relocation.with_audit_sink(audit_sink.clone());
            matchmaker = matchmaker.with_audit_sink(audit_sink);
        }

        Ok(Self {
            repo,
            ingestion,
            relocation,
            matchmaker,
        })
    }

    pub async fn add_thought(
        &self,
        request: AddThoughtRequest,
        ctx: &UserContext,
        now: u64,
    ) -> Result<u128, IngestionError> {
        self.ingestion.add_thought(request, ctx, now).await
    }

    pub async fn smart_lookup(
        &self,
        query_text: &str,
        ctx: &UserContext,
        now: u64,
        deadline: Option<Instant>,
    ) -> LookupResult {
        self.matchmaker.smart_lookup(query_text, ctx, now, deadline).await
    }

    pub async fn handle_role_update(
        &self,
        event: &RoleUpdate,
    ) -> Result<RelocationSummary, RelocationError> {
        self.relocation.handle_role_update(event).await
    }

    pub async fn handle_source_updated(&self, event: &SourceUpdated) -> Result<(), RelocationError> {
        self.relocation.handle_source_updated(event).await
    }

    pub async fn thought_count(&self) -> usize {
        self.repo.thought_count().await
    }
}
