use std::sync::Arc;

use mnemex_core::audit::{AuditEvent, AuditOperation, AuditOutcome, AuditSink};
use mnemex_core::auth::{RoleUpdate, SourceUpdated};
use mnemex_core::error::{EngineError, ErrorCode};
use mnemex_core::model::Scope;
use mnemex_core::sanitize::SanitizationPolicy;
use storage::repo::{RepoError, Repository};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RelocationError {
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl EngineError for RelocationError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RelocationError::Storage(e) => e.error_code(),
        }
    }
}

/// Counts reported back after a `RoleUpdate` scan (§4.H), logged as one
/// `relocation_summary` audit line rather than returned per-thought.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocationSummary {
    pub scanned: usize,
    pub deleted: usize,
    pub retained: usize,
}

/// Reacts to identity and source-freshness events the rest of the engine
/// has no opinion on (component H). Owns no index of its own: every
/// decision is a read-then-write through the same `Repository` the
/// ingestion pipeline and Matchmaker already share.
pub struct RelocationManager {
    repo: Arc<Repository>,
    policy: Arc<dyn SanitizationPolicy>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl RelocationManager {
    pub fn new(repo: Arc<Repository>, policy: Arc<dyn SanitizationPolicy>) -> Self {
        Self {
            repo,
            policy,
            audit_sink: None,
        }
    }

    /// Attaches the cost accountant's audit trail, recording one
    /// `AuditOperation::Relocation` event per `handle_role_update` call.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    fn emit_audit_event(&self, event: AuditEvent) {
        if let Some(sink) = &self.audit_sink {
            let _ = sink.record(event);
        }
    }

    /// A caller's roles or memberships changed: re-evaluate every USER-scope
    /// thought they own, deleting the ones whose content or access tags now
    /// read as sensitive under the new identity and retaining the rest.
    /// PROJECT/DEPARTMENT/CLIENT-scoped thoughts are untouched — relocation
    /// only ever acts on thoughts owned outright by the affected user.
    pub async fn handle_role_update(
        &self,
        event: &RoleUpdate,
    ) -> Result<RelocationSummary, RelocationError> {
        let user_id = event.user_id.clone();
        let owned = self
            .repo
            .scan(|t| t.scope == Scope::User && t.owner_id == user_id)
            .await;

        let mut summary = RelocationSummary::default();
        for thought in owned {
            summary.scanned += 1;
            let sensitive = self.policy.contains_sensitive(
                &thought.prompt_text,
                &thought.reasoning_trace,
                &thought.final_response,
                &thought.access_roles,
                &thought.entities,
            );
            if sensitive {
                self.repo.delete_thought(thought.id).await?;
                summary.deleted += 1;
            } else {
                summary.retained += 1;
            }
        }

        info!(
            target: "ingestion::relocation",
            user_id = %event.user_id,
            scanned = summary.scanned,
            deleted = summary.deleted,
            retained = summary.retained,
            "relocation_summary"
        );

        let mut audit = AuditEvent::new(AuditOperation::Relocation, AuditOutcome::Succeeded);
        audit.actor = Some(event.user_id.clone());
        audit.metadata.insert("scanned".to_string(), summary.scanned.to_string());
        audit.metadata.insert("deleted".to_string(), summary.deleted.to_string());
        audit.metadata.insert("retained".to_string(), summary.retained.to_string());
        self.emit_audit_event(audit);

        Ok(summary)
    }

    /// A source document changed upstream: flip `is_stale` on every thought
    /// that cites it. Delegates entirely to `Repository::mark_source_stale`,
    /// which is already idempotent — a duplicate delivery of the same event
    /// is a no-op.
    pub async fn handle_source_updated(
        &self,
        event: &SourceUpdated,
    ) -> Result<(), RelocationError> {
        self.repo
            .mark_source_stale(event.source_urn.clone())
            .await?;
        Ok(())
    }
}
