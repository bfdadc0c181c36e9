use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use jobs::TaskRunner;
use mnemex_core::audit::{AuditEvent, AuditOperation, AuditOutcome, AuditSink};
use mnemex_core::error::{EngineError, ErrorCode};
use mnemex_core::federation::{FederationBroker, FederationError};
use mnemex_core::model::{CachedThought, Scope, GLOBAL_SCOPE_ID};
use mnemex_core::request::AddThoughtRequest;
use mnemex_core::model::UserContext;
use slm::embedding::{Embedder, EmbeddingError};
use slm::ner::EntityExtractor;
use storage::repo::{RepoError, Repository};
use thiserror::Error;
use tracing::warn;

/// Fallback recorded on the audit trail when a request carries no
/// `model_id` of its own, mirroring the teacher's own default-model
/// sentinel for audit events with no caller-supplied model identity.
const DEFAULT_EMBEDDING_MODEL_ID: &str = "embedding-default-v1";

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("invalid thought: {0}")]
    InvalidThought(String),
    #[error(transparent)]
    AccessDenied(#[from] FederationError),
    #[error("embedding failed after retries: {0}")]
    EmbeddingFailed(String),
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl EngineError for IngestionError {
    fn error_code(&self) -> ErrorCode {
        match self {
            IngestionError::InvalidThought(_) => ErrorCode::InvalidThought,
            IngestionError::AccessDenied(e) => e.error_code(),
            IngestionError::EmbeddingFailed(_) => ErrorCode::EmbeddingFailed,
            IngestionError::Storage(e) => e.error_code(),
        }
    }
}

/// Retry policy for the §4.G step 3 embed call and the per-scope `ttl_seconds`
/// defaults used when a caller does not supply one. Owned by the
/// composition root, not hardcoded in the pipeline: scopes with short
/// scratchpad semantics (USER) are expected to carry a small default,
/// GLOBAL facts a large one (§4.E).
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub embedding_retries: u32,
    pub retry_base_delay: Duration,
    pub default_ttl_seconds: u64,
    pub scope_ttl_seconds: HashMap<Scope, u64>,
}

impl IngestionConfig {
    fn ttl_for(&self, scope: Scope) -> u64 {
        self.scope_ttl_seconds
            .get(&scope)
            .copied()
            .unwrap_or(self.default_ttl_seconds)
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            embedding_retries: 3,
            retry_base_delay: Duration::from_millis(20),
            default_ttl_seconds: 86_400,
            scope_ttl_seconds: HashMap::new(),
        }
    }
}

/// `add_thought` pipeline (component G): validate, embed, persist, schedule
/// entity extraction, link graph. The critical section (§4.G step 4) is
/// entirely inside `Repository::put_thought`; embedding and extraction,
/// the two suspension-heavy steps, happen either before it or off the
/// request path entirely.
pub struct IngestionPipeline {
    repo: Arc<Repository>,
    broker: FederationBroker,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn EntityExtractor>,
    task_runner: Arc<dyn TaskRunner>,
    config: IngestionConfig,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl IngestionPipeline {
    pub fn new(
        repo: Arc<Repository>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn EntityExtractor>,
        task_runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self::with_config(repo, embedder, extractor, task_runner, IngestionConfig::default())
    }

    pub fn with_config(
        repo: Arc<Repository>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn EntityExtractor>,
        task_runner: Arc<dyn TaskRunner>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            repo,
            broker: FederationBroker::new(),
            embedder,
            extractor,
            task_runner,
            config,
            audit_sink: None,
        }
    }

    /// Attaches the cost accountant's audit trail, recording one
    /// `AuditOperation::Ingest` event per `add_thought` call (succeeded,
    /// denied, or failed). Grounded on the teacher's own optional
    /// `audit_sink` wiring on its ingestion pipeline and query engine.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    fn emit_audit_event(&self, event: AuditEvent) {
        if let Some(sink) = &self.audit_sink {
            let _ = sink.record(event);
        }
    }

    /// `now` is caller-supplied wall clock (seconds), mirroring
    /// `Matchmaker::smart_lookup` so ingest and lookup share one notion of
    /// time under test.
    pub async fn add_thought(
        &self,
        request: AddThoughtRequest,
        ctx: &UserContext,
        now: u64,
    ) -> Result<u128, IngestionError> {
        let model_id = request
            .model_id
            .clone()
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL_ID.to_string());
        let actor = ctx.user_id.clone();
        let scope_id_for_audit = request.scope_id.clone();

        let result = self.add_thought_inner(request, ctx, now).await;

        match &result {
            Ok(_) => self.emit_audit_event(audit_event(
                AuditOutcome::Succeeded,
                &model_id,
                &actor,
                &scope_id_for_audit,
                None,
            )),
            Err(IngestionError::AccessDenied(err)) => self.emit_audit_event(audit_event(
                AuditOutcome::Denied,
                &model_id,
                &actor,
                &scope_id_for_audit,
                Some(err.to_string()),
            )),
            Err(err) => self.emit_audit_event(audit_event(
                AuditOutcome::Failed,
                &model_id,
                &actor,
                &scope_id_for_audit,
                Some(err.to_string()),
            )),
        }

        result
    }

    async fn add_thought_inner(
        &self,
        request: AddThoughtRequest,
        ctx: &UserContext,
        now: u64,
    ) -> Result<u128, IngestionError> {
        if request.prompt.trim().is_empty() {
            return Err(IngestionError::InvalidThought("prompt must not be empty".to_string()));
        }

        let scope_id = if request.scope == Scope::Global {
            GLOBAL_SCOPE_ID.to_string()
        } else {
            request.scope_id.clone()
        };

        // Step 1: scope/scope_id well-formedness + write authorization.
        self.broker.authorize_write(ctx, request.scope, &scope_id)?;

        let ttl_seconds = match request.ttl_seconds {
            Some(0) => {
                return Err(IngestionError::InvalidThought(
                    "ttl_seconds must be >= 1".to_string(),
                ))
            }
            Some(ttl) => ttl,
            None => self.config.ttl_for(request.scope),
        };

        // Step 3: embed, with bounded retry.
        let embedding_text = request.embedding_text();
        let vector = self.embed_with_retry(&embedding_text).await?;
        if vector.is_empty() {
            return Err(IngestionError::InvalidThought(
                "embedding dims must be > 0".to_string(),
            ));
        }

        // Step 2: synthesize the thought. `response` backs both
        // `reasoning_trace` and `final_response`: the public signature
        // carries a single completion blob from the caller, not a
        // pre-split reasoning/answer pair, so both fields start out equal
        // until a richer upstream format exists.
        let thought = CachedThought {
            id: uuid::Uuid::new_v4().as_u128(),
            vector,
            entities: HashSet::new(),
            scope: request.scope,
            scope_id,
            owner_id: ctx.user_id.clone(),
            prompt_text: request.prompt.clone(),
            reasoning_trace: request.response.clone(),
            final_response: request.response.clone(),
            source_urns: request.source_urns.clone(),
            is_stale: false,
            created_at: now,
            ttl_seconds,
            access_roles: HashSet::new(),
        };

        // Step 4: atomic persist (thought row + vector entry + structural
        // graph edges), logged as one WAL transaction by `Repository`.
        self.repo.put_thought(thought.clone()).await?;

        // Step 5: schedule entity extraction off the request path. `submit`
        // only suspends until the work is accepted onto the runtime, not
        // until it completes.
        self.schedule_extraction(thought.id, embedding_text).await;

        Ok(thought.id)
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, IngestionError> {
        let mut attempt = 0;
        loop {
            match self.embedder.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.config.embedding_retries {
                        return Err(IngestionError::EmbeddingFailed(err.to_string()));
                    }
                    let backoff = self.config.retry_base_delay * 2u32.pow(attempt - 1);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn schedule_extraction(&self, thought_id: u128, text: String) {
        let repo = self.repo.clone();
        let extractor = self.extractor.clone();
        let work: jobs::BoxedWork = Box::pin(async move {
            if repo.is_tombstoned(thought_id).await {
                return;
            }
            match extractor.extract(&text).await {
                Ok(entities) => {
                    let labels: HashSet<String> =
                        entities.into_iter().map(|e| e.label()).collect();
                    if let Err(err) = repo.update_entities(thought_id, labels).await {
                        warn!(target: "ingestion::processor", thought_id, %err, "failed to persist extracted entities");
                    }
                }
                Err(err) => {
                    warn!(target: "ingestion::processor", thought_id, %err, "entity extraction failed, entities left empty");
                }
            }
        });
        self.task_runner.submit(work).await;
    }
}

impl From<EmbeddingError> for IngestionError {
    fn from(err: EmbeddingError) -> Self {
        IngestionError::EmbeddingFailed(err.to_string())
    }
}

fn audit_event(
    outcome: AuditOutcome,
    model_id: &str,
    actor: &str,
    scope_id: &str,
    error: Option<String>,
) -> AuditEvent {
    let mut event = AuditEvent::new(AuditOperation::Ingest, outcome);
    event.model_id = Some(model_id.to_string());
    event.actor = Some(actor.to_string());
    event.scope_id = Some(scope_id.to_string());
    if let Some(error) = error {
        event.metadata.insert("error".to_string(), error);
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobs::ChannelTaskRunner;
    use mnemex_core::model::Scope;
    use slm::embedding::BagOfWordsEmbedder;
    use slm::ner::MockEntityExtractor;
    use tempfile::tempdir;

    async fn pipeline(repo: Arc<Repository>) -> IngestionPipeline {
        IngestionPipeline::new(
            repo,
            Arc::new(BagOfWordsEmbedder::new(32)),
            Arc::new(MockEntityExtractor::new()),
            Arc::new(ChannelTaskRunner::new(8)),
        )
    }

    #[tokio::test]
    async fn add_thought_persists_and_links_graph() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let pipeline = pipeline(repo.clone()).await;
        let ctx = UserContext::new("u1").with_project_ids(["project_apollo"]);

        let request = AddThoughtRequest::new(
            "How do we handle error retries?",
            "exponential backoff with jitter",
            Scope::Project,
            "project_apollo",
        );

        let id = pipeline.add_thought(request, &ctx, 1_000).await.unwrap();
        let stored = repo.get(id).await.unwrap();
        assert_eq!(stored.final_response, "exponential backoff with jitter");
        assert!((stored.vector.iter().map(|v| v * v).sum::<f32>().sqrt() - 1.0).abs() < 1e-5);

        assert!(
            repo.linked(
                &mnemex_core::model::thought_label(id),
                &mnemex_core::model::user_label("u1"),
                1
            )
            .await
        );
    }

    #[tokio::test]
    async fn add_thought_rejects_empty_prompt() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let pipeline = pipeline(repo).await;
        let ctx = UserContext::new("u1");

        let request = AddThoughtRequest::new("   ", "response", Scope::User, "u1");
        let err = pipeline.add_thought(request, &ctx, 1_000).await.unwrap_err();
        assert!(matches!(err, IngestionError::InvalidThought(_)));
    }

    #[tokio::test]
    async fn add_thought_records_audit_event_with_model_id() {
        use mnemex_core::audit::InMemoryAuditSink;

        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let sink = Arc::new(InMemoryAuditSink::default());
        let pipeline = IngestionPipeline::new(
            repo,
            Arc::new(BagOfWordsEmbedder::new(32)),
            Arc::new(MockEntityExtractor::new()),
            Arc::new(ChannelTaskRunner::new(8)),
        )
        .with_audit_sink(sink.clone());
        let ctx = UserContext::new("u1");

        let mut request = AddThoughtRequest::new("prompt", "response", Scope::User, "u1");
        request.model_id = Some("embedding-audit-v1".to_string());
        pipeline.add_thought(request, &ctx, 1_000).await.unwrap();

        let events = sink.events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, AuditOperation::Ingest);
        assert_eq!(events[0].outcome, AuditOutcome::Succeeded);
        assert_eq!(events[0].model_id.as_deref(), Some("embedding-audit-v1"));
    }

    #[tokio::test]
    async fn add_thought_records_denied_audit_event() {
        use mnemex_core::audit::InMemoryAuditSink;

        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let sink = Arc::new(InMemoryAuditSink::default());
        let pipeline = IngestionPipeline::new(
            repo,
            Arc::new(BagOfWordsEmbedder::new(32)),
            Arc::new(MockEntityExtractor::new()),
            Arc::new(ChannelTaskRunner::new(8)),
        )
        .with_audit_sink(sink.clone());
        let ctx = UserContext::new("u1");

        let request = AddThoughtRequest::new("prompt", "response", Scope::User, "someone-else");
        let err = pipeline.add_thought(request, &ctx, 1_000).await.unwrap_err();
        assert!(matches!(err, IngestionError::AccessDenied(_)));

        let events = sink.events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Denied);
        assert_eq!(events[0].actor.as_deref(), Some("u1"));
        assert!(events[0].metadata.contains_key("error"));
    }

    #[tokio::test]
    async fn add_thought_rejects_zero_ttl() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let pipeline = pipeline(repo).await;
        let ctx = UserContext::new("u1");

        let request = AddThoughtRequest::new("prompt", "response", Scope::User, "u1")
            .with_ttl_seconds(0);
        let err = pipeline.add_thought(request, &ctx, 1_000).await.unwrap_err();
        assert!(matches!(err, IngestionError::InvalidThought(_)));
    }

    #[tokio::test]
    async fn global_scope_is_normalized_to_sentinel_id() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let pipeline = pipeline(repo.clone()).await;
        let ctx = UserContext::new("u1").with_roles(["archive:write_global"]);

        let request = AddThoughtRequest::new("prompt", "response", Scope::Global, "ignored");
        let id = pipeline.add_thought(request, &ctx, 1_000).await.unwrap();

        let stored = repo.get(id).await.unwrap();
        assert_eq!(stored.scope_id, GLOBAL_SCOPE_ID);
    }

    #[tokio::test]
    async fn entity_extraction_completes_asynchronously() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
        let pipeline = pipeline(repo.clone()).await;
        let ctx = UserContext::new("u1");

        let request = AddThoughtRequest::new(
            "Tell me about Rust",
            "Rust is great for AI systems",
            Scope::User,
            "u1",
        );
        let id = pipeline.add_thought(request, &ctx, 1_000).await.unwrap();

        // Extraction runs on the task runner; poll briefly for completion.
        for _ in 0..20 {
            let stored = repo.get(id).await.unwrap();
            if !stored.entities.is_empty() {
                assert!(stored.entities.contains("Language:Rust"));
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("entities were never linked");
    }
}
