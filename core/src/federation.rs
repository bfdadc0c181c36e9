use crate::error::{EngineError, ErrorCode};
use crate::model::{CachedThought, Scope, UserContext};
use thiserror::Error;

/// Role required to write a GLOBAL-scoped thought.
pub const WRITE_GLOBAL_ROLE: &str = "archive:write_global";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FederationError {
    #[error("scope_id must not be empty for scope {scope}")]
    EmptyScopeId { scope: &'static str },
    #[error("USER-scoped writes require scope_id to equal the caller's user_id")]
    UserScopeMismatch,
    #[error("caller is not a member of project {scope_id}")]
    NotProjectMember { scope_id: String },
    #[error("caller is not a member of department {scope_id}")]
    NotDeptMember { scope_id: String },
    #[error("caller is not associated with client {scope_id}")]
    NotClientMember { scope_id: String },
    #[error("writing GLOBAL scope requires role {WRITE_GLOBAL_ROLE}")]
    MissingGlobalWriteRole,
}

impl EngineError for FederationError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::AccessDenied
    }
}

/// Compiles a `UserContext` into the scope predicate described in the
/// component design and enforces it on every read and write path. There is
/// no unfiltered read API exposed beyond this broker.
#[derive(Debug, Default, Clone, Copy)]
pub struct FederationBroker;

impl FederationBroker {
    pub fn new() -> Self {
        Self
    }

    /// `P(t)` — the scope-filter predicate. Pure function: no I/O, no
    /// interior mutability, safe to call from the scoring loop without
    /// suspension.
    pub fn can_read(&self, ctx: &UserContext, t: &CachedThought) -> bool {
        let scope_ok = match t.scope {
            Scope::User => t.owner_id == ctx.user_id,
            Scope::Project => ctx.project_ids.contains(&t.scope_id),
            Scope::Department => ctx.dept_ids.contains(&t.scope_id),
            Scope::Client => ctx.client_ids.contains(&t.scope_id),
            Scope::Global => true,
        };
        scope_ok && t.access_roles.is_subset(&ctx.roles)
    }

    /// Enforces the §4.G step 1 write-authorization rule for a prospective
    /// ingest under `scope`/`scope_id`.
    pub fn authorize_write(
        &self,
        ctx: &UserContext,
        scope: Scope,
        scope_id: &str,
    ) -> Result<(), FederationError> {
        if scope != Scope::Global && scope_id.trim().is_empty() {
            return Err(FederationError::EmptyScopeId {
                scope: scope.as_str(),
            });
        }

        match scope {
            Scope::User => {
                if scope_id != ctx.user_id {
                    return Err(FederationError::UserScopeMismatch);
                }
            }
            Scope::Project => {
                if !ctx.project_ids.contains(scope_id) {
                    return Err(FederationError::NotProjectMember {
                        scope_id: scope_id.to_string(),
                    });
                }
            }
            Scope::Department => {
                if !ctx.dept_ids.contains(scope_id) {
                    return Err(FederationError::NotDeptMember {
                        scope_id: scope_id.to_string(),
                    });
                }
            }
            Scope::Client => {
                if !ctx.client_ids.contains(scope_id) {
                    return Err(FederationError::NotClientMember {
                        scope_id: scope_id.to_string(),
                    });
                }
            }
            Scope::Global => {
                if !ctx.roles.contains(WRITE_GLOBAL_ROLE) {
                    return Err(FederationError::MissingGlobalWriteRole);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn thought(scope: Scope, scope_id: &str, owner_id: &str) -> CachedThought {
        CachedThought {
            id: 1,
            vector: vec![1.0, 0.0],
            entities: HashSet::new(),
            scope,
            scope_id: scope_id.to_string(),
            owner_id: owner_id.to_string(),
            prompt_text: "p".to_string(),
            reasoning_trace: "r".to_string(),
            final_response: "f".to_string(),
            source_urns: vec![],
            is_stale: false,
            created_at: 0,
            ttl_seconds: 60,
            access_roles: HashSet::new(),
        }
    }

    #[test]
    fn user_scope_requires_ownership() {
        let broker = FederationBroker::new();
        let t = thought(Scope::User, "u1", "u1");
        let owner_ctx = UserContext::new("u1");
        let other_ctx = UserContext::new("u2");

        assert!(broker.can_read(&owner_ctx, &t));
        assert!(!broker.can_read(&other_ctx, &t));
    }

    #[test]
    fn department_scope_requires_membership() {
        let broker = FederationBroker::new();
        let t = thought(Scope::Department, "dept_rnd", "senior");
        let member = UserContext::new("junior").with_dept_ids(["dept_rnd"]);
        let outsider = UserContext::new("junior").with_dept_ids(["dept_compliance"]);

        assert!(broker.can_read(&member, &t));
        assert!(!broker.can_read(&outsider, &t));
    }

    #[test]
    fn global_scope_always_visible_but_respects_access_roles() {
        let broker = FederationBroker::new();
        let mut t = thought(Scope::Global, "*", "u1");
        t.access_roles = HashSet::from(["secret:finance".to_string()]);

        let unprivileged = UserContext::new("u2");
        let privileged = UserContext::new("u2").with_roles(["secret:finance"]);

        assert!(!broker.can_read(&unprivileged, &t));
        assert!(broker.can_read(&privileged, &t));
    }

    #[test]
    fn authorize_write_enforces_user_scope_identity() {
        let broker = FederationBroker::new();
        let ctx = UserContext::new("u1");
        assert!(broker.authorize_write(&ctx, Scope::User, "u1").is_ok());
        assert_eq!(
            broker.authorize_write(&ctx, Scope::User, "u2"),
            Err(FederationError::UserScopeMismatch)
        );
    }

    #[test]
    fn authorize_write_global_requires_dedicated_role() {
        let broker = FederationBroker::new();
        let ctx = UserContext::new("u1");
        assert_eq!(
            broker.authorize_write(&ctx, Scope::Global, "*"),
            Err(FederationError::MissingGlobalWriteRole)
        );

        let privileged = UserContext::new("u1").with_roles([WRITE_GLOBAL_ROLE]);
        assert!(broker.authorize_write(&privileged, Scope::Global, "*").is_ok());
    }
}
