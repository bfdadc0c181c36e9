use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use mnemex_core::error::{EngineError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding failed: {0}")]
    Failed(String),
}

impl EngineError for EmbeddingError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::EmbeddingFailed
    }
}

/// Maps text to a fixed-dimension real vector (§6 `Embedder`). Ingest
/// retries up to 3 times with exponential backoff on failure; lookup
/// surfaces `MISS` after a single failed embed.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dims(&self) -> usize;
}

/// Deterministic bag-of-words embedder using the hashing-trick (tokens
/// hashed directly into a fixed-width bucket vector, no vocabulary table).
/// Unlike a pure content-hash of the whole string, texts that share
/// vocabulary land close together in cosine space, which is what the
/// Matchmaker's SEMANTIC_HINT band (§4.F step 6) needs to be exercised
/// without a real model.
pub struct BagOfWordsEmbedder {
    dims: usize,
}

impl BagOfWordsEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.dims == 0 {
            return Err(EmbeddingError::Failed("embedding dims must be > 0".to_string()));
        }

        let mut buckets = vec![0f32; self.dims];
        for token in tokenize(text) {
            let bucket = (hash_token(&token) % self.dims as u64) as usize;
            buckets[bucket] += 1.0;
        }

        normalize_l2(&mut buckets);
        Ok(buckets)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn hash_token(token: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

pub fn normalize_l2(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
