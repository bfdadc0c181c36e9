use crate::model::Scope;
use serde::{Deserialize, Serialize};

/// Caller-supplied payload for `IngestionPipeline::add_thought`. Fields not
/// set by the caller (`id`, `created_at`, `is_stale`, `entities`,
/// `access_roles`) are synthesized by the pipeline per §4.G step 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddThoughtRequest {
    pub prompt: String,
    pub response: String,
    pub scope: Scope,
    pub scope_id: String,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub source_urns: Vec<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl AddThoughtRequest {
    pub fn new(
        prompt: impl Into<String>,
        response: impl Into<String>,
        scope: Scope,
        scope_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            scope,
            scope_id: scope_id.into(),
            ttl_seconds: None,
            source_urns: Vec::new(),
            model_id: None,
        }
    }

    pub fn with_ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    pub fn with_source_urns(mut self, urns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.source_urns = urns.into_iter().map(Into::into).collect();
        self
    }

    /// The text embedded for this thought: `prompt + "\n" + response`.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.prompt, self.response)
    }
}
