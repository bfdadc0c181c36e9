use crate::model::Scope;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: String,
    pub wal_flush_interval_ms: u64,
}

/// Classification thresholds, graph-boost factor, candidate fan-out, and
/// per-scope decay defaults. Owned by the composition root and handed to the
/// Matchmaker and Temporal Ranker at startup; neither holds a policy of its
/// own beyond what's configured here.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub embedding_dim: usize,
    pub exact_hit_threshold: f32,
    pub semantic_hint_threshold: f32,
    pub graph_boost_beta: f32,
    pub candidate_k: usize,
    pub decay_convention: String,
    pub default_ttl_seconds: HashMap<String, u64>,
}

impl CacheConfig {
    /// `ttl_seconds` default for a scope, falling back to the GLOBAL entry
    /// (or one day) if the scope has no explicit override.
    pub fn default_ttl_for(&self, scope: Scope) -> u64 {
        let key = scope.as_str();
        self.default_ttl_seconds
            .get(key)
            .copied()
            .or_else(|| self.default_ttl_seconds.get("GLOBAL").copied())
            .unwrap_or(86_400)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("MNEMEX").separator("__"));

        builder.build()?.try_deserialize()
    }
}
