use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashSet;

/// Hierarchical visibility domain for a thought.
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[archive(check_bytes)]
#[archive_attr(derive(Debug, PartialEq))]
pub enum Scope {
    User,
    Project,
    Department,
    Client,
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "USER",
            Scope::Project => "PROJECT",
            Scope::Department => "DEPARTMENT",
            Scope::Client => "CLIENT",
            Scope::Global => "GLOBAL",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Some(Scope::User),
            "PROJECT" => Some(Scope::Project),
            "DEPARTMENT" | "DEPT" => Some(Scope::Department),
            "CLIENT" => Some(Scope::Client),
            "GLOBAL" => Some(Scope::Global),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sentinel `scope_id` for GLOBAL-scoped thoughts.
pub const GLOBAL_SCOPE_ID: &str = "*";

/// Graph edge relation types. Edges are idempotent: inserting an existing
/// `(from, relation, to)` triple is a no-op at the Graph Index.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Relation {
    Created,
    BelongsTo,
    RelatedTo,
    MentionedIn,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Created => "CREATED",
            Relation::BelongsTo => "BELONGS_TO",
            Relation::RelatedTo => "RELATED_TO",
            Relation::MentionedIn => "MENTIONED_IN",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds the `Thought:<id>` graph label for a thought id.
pub fn thought_label(id: u128) -> String {
    format!("Thought:{id}")
}

/// Builds the `User:<id>` graph label for a user id.
pub fn user_label(user_id: &str) -> String {
    format!("User:{user_id}")
}

/// Builds the `<Scope>:<scope_id>` graph label for a scope membership node.
pub fn scope_label(scope: Scope, scope_id: &str) -> String {
    format!("{}:{}", scope.as_str(), scope_id)
}

/// The cached asset: a persisted tuple of (prompt, reasoning trace, final
/// response) from one completed agent computation, plus the metadata the
/// engine needs to rank and filter it.
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
#[archive(check_bytes)]
pub struct CachedThought {
    pub id: u128,
    pub vector: Vec<f32>,
    pub entities: HashSet<String>,
    pub scope: Scope,
    pub scope_id: String,
    pub owner_id: String,
    pub prompt_text: String,
    pub reasoning_trace: String,
    pub final_response: String,
    pub source_urns: Vec<String>,
    pub is_stale: bool,
    pub created_at: u64,
    pub ttl_seconds: u64,
    pub access_roles: HashSet<String>,
}

impl CachedThought {
    /// `Δt = now − created_at`, saturating at zero (never negative: callers
    /// must not observe a thought created in the future).
    pub fn age_seconds(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    pub fn label(&self) -> String {
        thought_label(self.id)
    }
}

/// Ephemeral per-query identity compiled by the identity provider. Backs
/// both the read-side scope predicate (Federation Broker) and the
/// write-side authorization check — there is no separate RBAC surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserContext {
    pub user_id: String,
    pub roles: HashSet<String>,
    pub dept_ids: HashSet<String>,
    pub project_ids: HashSet<String>,
    pub client_ids: HashSet<String>,
    pub active_project_id: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_project_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.project_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dept_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dept_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_client_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.client_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_active_project(mut self, project_id: impl Into<String>) -> Self {
        self.active_project_id = Some(project_id.into());
        self
    }
}
