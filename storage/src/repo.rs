use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use mnemex_core::error::{EngineError, ErrorCode};
use mnemex_core::model::{thought_label, user_label, CachedThought, Scope};
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::crypto::AtRestCipher;
use crate::hyper_index::HyperIndex;
use crate::snapshot::{SnapshotError, SnapshotManager};
use crate::wal::{Wal, WalError};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("thought not found: {0}")]
    NotFound(u128),
}

impl EngineError for RepoError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RepoError::Wal(e) => e.error_code(),
            RepoError::Snapshot(e) => e.error_code(),
            RepoError::Serialization(_) => ErrorCode::IndexInconsistency,
            RepoError::NotFound(_) => ErrorCode::NotFound,
        }
    }
}

/// One atomically-applied mutation to the Thought Store + indices, logged to
/// the WAL as a single record so a crash mid-apply never leaves a
/// partially-visible thought (invariant 5, §4.G step 4).
#[derive(Archive, RkyvSerialize, RkyvDeserialize, Debug, Clone)]
#[archive(check_bytes)]
pub enum WalRecord {
    /// Insert or overwrite a thought and its scope-membership edges.
    PutThought(CachedThought),
    /// Overwrite just the `entities` field (extractor completion callback).
    UpdateEntities { id: u128, entities: Vec<String> },
    /// Flip `is_stale` on every thought carrying `source_urn`.
    MarkStale { source_urn: String },
    /// Full erasure from all three indices.
    DeleteThought { id: u128 },
}

/// A full-state dump used to bound WAL replay time on restart. Not a
/// durability requirement beyond the WAL itself (§4.C).
#[derive(Archive, RkyvSerialize, RkyvDeserialize, Debug, Clone, Default)]
#[archive(check_bytes)]
pub struct RepositorySnapshot {
    pub thoughts: Vec<CachedThought>,
}

/// Authoritative record of `CachedThought` entities (component C), combined
/// with the Vector Index and Graph Index (components A/B) behind one
/// write-ahead-logged surface. Lock order for multi-index mutation is
/// Thought Store → Vector Index → Graph Index; `HyperIndex` already wraps
/// the latter two, so acquiring `thoughts` then `indices` in that order
/// honors it everywhere in this file.
pub struct Repository {
    wal: RwLock<Wal>,
    snapshot_manager: SnapshotManager,
    thoughts: RwLock<HashMap<u128, CachedThought>>,
    indices: RwLock<HyperIndex>,
    /// Deleted-thought tombstones, consulted by the extractor-completion
    /// callback so a racing entity update for an already-deleted thought is
    /// a no-op (§4.G step 5, §5 Cancellation).
    tombstones: RwLock<HashSet<u128>>,
}

const SNAPSHOT_EVERY_N_WRITES: u64 = 256;

impl Repository {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, RepoError> {
        Self::open_with_cipher(data_dir, Arc::new(crate::crypto::NoOpCipher)).await
    }

    pub async fn open_with_cipher(
        data_dir: impl AsRef<Path>,
        cipher: Arc<dyn AtRestCipher>,
    ) -> Result<Self, RepoError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let wal_path = data_dir.join("wal.log");
        let snapshot_dir = data_dir.join("snapshots");

        let snapshot_manager = SnapshotManager::new(&snapshot_dir);
        let mut wal = Wal::open_with_cipher(&wal_path, cipher).await?;

        let mut thoughts = HashMap::new();
        let mut indices = HyperIndex::new();

        if let Some((_lsn, path)) = snapshot_manager.latest_snapshot().await? {
            let bytes = tokio::fs::read(&path).await.map_err(WalError::Io)?;
            let archived = rkyv::check_archived_root::<RepositorySnapshot>(&bytes[..])
                .map_err(|e| RepoError::Serialization(e.to_string()))?;
            let snapshot: RepositorySnapshot = archived
                .deserialize(&mut rkyv::Infallible)
                .expect("infallible deserializer");
            for thought in snapshot.thoughts {
                apply_put(&mut thoughts, &mut indices, thought);
            }
        }

        let mut tombstones = HashSet::new();
        wal.replay(|_lsn, payload| {
            let archived = rkyv::check_archived_root::<WalRecord>(&payload[..]).map_err(|e| {
                WalError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
            })?;
            let record: WalRecord = archived
                .deserialize(&mut rkyv::Infallible)
                .expect("infallible deserializer");
            apply_record(&mut thoughts, &mut indices, &mut tombstones, record);
            Ok(())
        })
        .await?;

        Ok(Self {
            wal: RwLock::new(wal),
            snapshot_manager,
            thoughts: RwLock::new(thoughts),
            indices: RwLock::new(indices),
            tombstones: RwLock::new(tombstones),
        })
    }

    async fn append_and_apply(&self, record: WalRecord) -> Result<(), RepoError> {
        let bytes = serialize_wal_record(&record)?;

        {
            let mut wal = self.wal.write().await;
            wal.append(&bytes).await?;
            wal.flush().await?;
        }

        let lsn = {
            let mut thoughts = self.thoughts.write().await;
            let mut indices = self.indices.write().await;
            let mut tombstones = self.tombstones.write().await;
            apply_record(&mut thoughts, &mut indices, &mut tombstones, record);
            self.wal.read().await.current_lsn()
        };

        if lsn % SNAPSHOT_EVERY_N_WRITES == 0 {
            let thoughts = self.thoughts.read().await;
            let snapshot = RepositorySnapshot {
                thoughts: thoughts.values().cloned().collect(),
            };
            drop(thoughts);
            let bytes = serialize_snapshot(&snapshot)?;
            self.snapshot_manager.create_snapshot(lsn, &bytes).await?;
        }

        Ok(())
    }

    /// Inserts a thought and its structural edges (Thought node, CREATED
    /// edge, scope-membership edge) as one WAL transaction (§4.G step 4).
    pub async fn put_thought(&self, thought: CachedThought) -> Result<(), RepoError> {
        self.append_and_apply(WalRecord::PutThought(thought)).await
    }

    pub async fn get(&self, id: u128) -> Option<CachedThought> {
        self.thoughts.read().await.get(&id).cloned()
    }

    /// Linear scan filtered by `predicate`. Acceptable at this scale; the
    /// Matchmaker never calls this on the hot path (it goes through the
    /// Vector Index instead).
    pub async fn scan<F>(&self, predicate: F) -> Vec<CachedThought>
    where
        F: Fn(&CachedThought) -> bool,
    {
        self.thoughts
            .read()
            .await
            .values()
            .filter(|t| predicate(t))
            .cloned()
            .collect()
    }

    pub async fn delete_thought(&self, id: u128) -> Result<(), RepoError> {
        self.append_and_apply(WalRecord::DeleteThought { id }).await
    }

    /// Overwrites `entities` for a thought (extractor completion callback).
    /// A no-op, by construction via the tombstone check in `apply_record`,
    /// if the thought has since been deleted.
    pub async fn update_entities(
        &self,
        id: u128,
        entities: HashSet<String>,
    ) -> Result<(), RepoError> {
        self.append_and_apply(WalRecord::UpdateEntities {
            id,
            entities: entities.into_iter().collect(),
        })
        .await
    }

    /// Flips `is_stale` on every thought carrying `source_urn`. Idempotent:
    /// re-applying is not observable after the first application.
    pub async fn mark_source_stale(&self, source_urn: String) -> Result<(), RepoError> {
        self.append_and_apply(WalRecord::MarkStale { source_urn }).await
    }

    pub async fn is_tombstoned(&self, id: u128) -> bool {
        self.tombstones.read().await.contains(&id)
    }

    pub async fn search_vector(&self, query: &[f32], k: usize) -> Vec<(u128, f32)> {
        self.indices.read().await.search_vector(query, k)
    }

    pub async fn linked(&self, a: &str, b: &str, max_hops: u8) -> bool {
        self.indices.read().await.linked(a, b, max_hops)
    }

    pub async fn thought_count(&self) -> usize {
        self.thoughts.read().await.len()
    }
}

fn apply_put(
    thoughts: &mut HashMap<u128, CachedThought>,
    indices: &mut HyperIndex,
    thought: CachedThought,
) {
    let id = thought.id;
    let label = thought_label(id);
    indices.insert_vector(id, thought.vector.clone());
    indices.add_node(label.clone());
    indices.add_edge(label.clone(), "CREATED", user_label(&thought.owner_id), 1.0);
    indices.add_edge(
        label,
        "BELONGS_TO",
        mnemex_core::model::scope_label(thought.scope, &thought.scope_id),
        1.0,
    );
    thoughts.insert(id, thought);
}

fn apply_record(
    thoughts: &mut HashMap<u128, CachedThought>,
    indices: &mut HyperIndex,
    tombstones: &mut HashSet<u128>,
    record: WalRecord,
) {
    match record {
        WalRecord::PutThought(thought) => {
            tombstones.remove(&thought.id);
            apply_put(thoughts, indices, thought);
        }
        WalRecord::UpdateEntities { id, entities } => {
            if tombstones.contains(&id) {
                return;
            }
            if let Some(thought) = thoughts.get_mut(&id) {
                let label = thought_label(id);
                for entity in &entities {
                    indices.add_node(entity.clone());
                    indices.add_edge(label.clone(), "MENTIONED_IN", entity.clone(), 1.0);
                }
                thought.entities = entities.into_iter().collect();
            }
        }
        WalRecord::MarkStale { source_urn } => {
            for thought in thoughts.values_mut() {
                if thought.source_urns.iter().any(|u| *u == source_urn) {
                    thought.is_stale = true;
                }
            }
        }
        WalRecord::DeleteThought { id } => {
            thoughts.remove(&id);
            indices.remove_thought(id);
            tombstones.insert(id);
        }
    }
}

fn serialize_wal_record(record: &WalRecord) -> Result<Vec<u8>, RepoError> {
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(record)
        .map_err(|e| RepoError::Serialization(e.to_string()))?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}

fn serialize_snapshot(snapshot: &RepositorySnapshot) -> Result<Vec<u8>, RepoError> {
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(snapshot)
        .map_err(|e| RepoError::Serialization(e.to_string()))?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}
