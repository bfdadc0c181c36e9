use async_trait::async_trait;
use mnemex_core::error::{EngineError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extractor failed: {0}")]
    Failed(String),
}

impl EngineError for ExtractionError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::ExtractionFailed
    }
}

/// One extracted entity. `label()` renders the `<Type>:<Name>` graph label
/// the Matchmaker and Graph Index key on (§3 GraphNode).
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_type: String,
    pub name: String,
    pub confidence: f32,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, name: impl Into<String>, confidence: f32) -> Self {
        Self {
            entity_type: entity_type.into(),
            name: name.into(),
            confidence,
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.entity_type, self.name)
    }
}

/// Maps text to typed entity labels (§6 `EntityExtractor`). Failure leaves
/// the thought's `entities` empty; there is no retry for extraction (unlike
/// embedding).
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<Entity>, ExtractionError>;
}

/// Reference keyword-driven extractor (§1 "Out of scope... Reference: a
/// keyword-driven extractor").
pub struct MockEntityExtractor {
    keywords: Vec<(String, String)>, // (keyword, entity_type)
}

impl MockEntityExtractor {
    pub fn new() -> Self {
        Self {
            keywords: vec![
                ("Rust".to_string(), "Language".to_string()),
                ("Python".to_string(), "Language".to_string()),
                ("AI".to_string(), "Topic".to_string()),
                ("Database".to_string(), "Topic".to_string()),
                ("Graph".to_string(), "Concept".to_string()),
                ("Vector".to_string(), "Concept".to_string()),
            ],
        }
    }

    pub fn with_keywords(keywords: Vec<(String, String)>) -> Self {
        Self { keywords }
    }
}

impl Default for MockEntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityExtractor for MockEntityExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Entity>, ExtractionError> {
        let mut entities = Vec::new();
        let lower_text = text.to_lowercase();

        for (keyword, entity_type) in &self.keywords {
            if lower_text.contains(&keyword.to_lowercase()) {
                entities.push(Entity::new(entity_type.clone(), keyword.clone(), 0.9));
            }
        }

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_extraction_matches_known_keywords() {
        let extractor = MockEntityExtractor::new();
        let text = "I love programming in Rust and building AI systems.";
        let entities = extractor.extract(text).await.unwrap();

        assert!(entities.iter().any(|e| e.label() == "Language:Rust"));
        assert!(entities.iter().any(|e| e.label() == "Topic:AI"));
    }
}
