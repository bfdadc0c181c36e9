use std::sync::Arc;
use std::time::Duration;

use ingestion::{IngestionPipeline, RelocationManager};
use jobs::ChannelTaskRunner;
use mnemex_core::auth::RoleUpdate;
use mnemex_core::cost::InMemoryCostAccountantSink;
use mnemex_core::model::{Scope, UserContext};
use mnemex_core::request::AddThoughtRequest;
use mnemex_core::sanitize::BasicSanitizationPolicy;
use query::{LookupResult, Matchmaker, MatchmakerConfig};
use slm::embedding::BagOfWordsEmbedder;
use slm::ner::MockEntityExtractor;
use storage::repo::Repository;
use tempfile::tempdir;

fn matchmaker(repo: Arc<Repository>) -> Matchmaker {
    Matchmaker::new(
        repo,
        Arc::new(BagOfWordsEmbedder::new(256)),
        Arc::new(MockEntityExtractor::new()),
        Arc::new(InMemoryCostAccountantSink::default()),
        MatchmakerConfig::default(),
    )
}

async fn wait_for_entities(repo: &Repository, id: u128) {
    for _ in 0..50 {
        if let Some(t) = repo.get(id).await {
            if !t.entities.is_empty() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("entities were never linked for thought {id}");
}

/// Seed scenario 1: ingest then immediately look up the same prompt under
/// the same project scope.
#[tokio::test]
async fn exact_hit_round_trips_through_ingest_and_lookup() {
    let dir = tempdir().unwrap();
    let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
    let pipeline = IngestionPipeline::new(
        repo.clone(),
        Arc::new(BagOfWordsEmbedder::new(256)),
        Arc::new(MockEntityExtractor::new()),
        Arc::new(ChannelTaskRunner::new(8)),
    );

    let ctx = UserContext::new("u1").with_project_ids(["project_apollo"]);
    let request = AddThoughtRequest::new(
        "How do we handle error retries?",
        "exponential backoff with jitter",
        Scope::Project,
        "project_apollo",
    );
    pipeline.add_thought(request, &ctx, 1_000).await.unwrap();

    let result = matchmaker(repo)
        .smart_lookup("How do we handle error retries?", &ctx, 1_000, None)
        .await;

    match result {
        LookupResult::ExactHit { final_response, .. } => {
            assert_eq!(final_response, "exponential backoff with jitter");
        }
        other => panic!("expected ExactHit, got {other:?}"),
    }
}

/// Seed scenario 3 vs 4: the same DEPT-scoped thought about "Drug Z" is
/// found via entity hop by a department peer and missed entirely by an
/// outsider, once extraction has completed asynchronously.
#[tokio::test]
async fn entity_hop_finds_low_similarity_peer_thought_scope_isolation_misses() {
    let dir = tempdir().unwrap();
    let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
    let pipeline = IngestionPipeline::new(
        repo.clone(),
        Arc::new(BagOfWordsEmbedder::new(256)),
        Arc::new(MockEntityExtractor::with_keywords(vec![(
            "Drug Z".to_string(),
            "Drug".to_string(),
        )])),
        Arc::new(ChannelTaskRunner::new(8)),
    );

    let senior = UserContext::new("senior").with_dept_ids(["dept_rnd"]);
    let request = AddThoughtRequest::new(
        "Clinical trial notes",
        "Drug Z caused elevated liver enzymes in cohort B",
        Scope::Department,
        "dept_rnd",
    );
    let id = pipeline.add_thought(request, &senior, 1_000).await.unwrap();
    wait_for_entities(&repo, id).await;

    let mm = Matchmaker::new(
        repo.clone(),
        Arc::new(BagOfWordsEmbedder::new(256)),
        Arc::new(MockEntityExtractor::with_keywords(vec![(
            "Drug Z".to_string(),
            "Drug".to_string(),
        )])),
        Arc::new(InMemoryCostAccountantSink::default()),
        MatchmakerConfig::default(),
    );

    let junior = UserContext::new("junior").with_dept_ids(["dept_rnd"]);
    let hit = mm
        .smart_lookup("Issues with Drug Z?", &junior, 1_000, None)
        .await;
    match hit {
        LookupResult::EntityHop { reasoning_trace, .. } => {
            assert_eq!(reasoning_trace, "Drug Z caused elevated liver enzymes in cohort B");
        }
        other => panic!("expected EntityHop, got {other:?}"),
    }

    let outsider = UserContext::new("junior").with_dept_ids(["dept_compliance"]);
    let miss = mm
        .smart_lookup("Issues with Drug Z?", &outsider, 1_000, None)
        .await;
    assert_eq!(miss, LookupResult::Miss);
}

/// Seed scenario 5: a role update triggers relocation, deleting the
/// sensitive thought while the benign one stays retrievable.
#[tokio::test]
async fn role_update_sanitizes_sensitive_thought_but_keeps_benign_one() {
    let dir = tempdir().unwrap();
    let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
    let pipeline = IngestionPipeline::new(
        repo.clone(),
        Arc::new(BagOfWordsEmbedder::new(256)),
        Arc::new(MockEntityExtractor::new()),
        Arc::new(ChannelTaskRunner::new(8)),
    );

    let ctx = UserContext::new("u1");
    pipeline
        .add_thought(
            AddThoughtRequest::new("notes", "standup notes for today", Scope::User, "u1"),
            &ctx,
            1_000,
        )
        .await
        .unwrap();
    pipeline
        .add_thought(
            AddThoughtRequest::new("notes", "the Secret R&D Formula is X", Scope::User, "u1"),
            &ctx,
            1_000,
        )
        .await
        .unwrap();

    let relocation = RelocationManager::new(repo.clone(), Arc::new(BasicSanitizationPolicy::default()));
    let summary = relocation
        .handle_role_update(&RoleUpdate {
            user_id: "u1".to_string(),
            added_roles: vec![],
            removed_roles: vec![],
            old_dept_ids: vec!["dept_rnd".to_string()],
            new_dept_ids: vec!["dept_compliance".to_string()],
            old_project_ids: vec![],
            new_project_ids: vec![],
        })
        .await
        .unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.retained, 1);

    let remaining = repo.scan(|t| t.owner_id == "u1").await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].final_response, "standup notes for today");
}

/// Seed scenario 6: a stale source is flipped after ingest and the same
/// lookup that used to hit now misses.
#[tokio::test]
async fn source_updated_makes_previously_hit_thought_miss() {
    let dir = tempdir().unwrap();
    let repo = Arc::new(Repository::open(dir.path()).await.unwrap());
    let pipeline = IngestionPipeline::new(
        repo.clone(),
        Arc::new(BagOfWordsEmbedder::new(256)),
        Arc::new(MockEntityExtractor::new()),
        Arc::new(ChannelTaskRunner::new(8)),
    );

    let ctx = UserContext::new("u1");
    let prompt = "status of the urn A data source";
    let response = "nightly refresh completed without errors";
    let request = AddThoughtRequest::new(prompt, response, Scope::User, "u1")
        .with_source_urns(["urn:A"]);
    pipeline.add_thought(request, &ctx, 1_000).await.unwrap();

    // Query with the exact embedding text so cosine similarity is 1.0
    // regardless of the hashing-trick embedder's bucket width.
    let query_text = format!("{prompt}\n{response}");
    let mm = matchmaker(repo.clone());
    let before = mm.smart_lookup(&query_text, &ctx, 1_000, None).await;
    assert!(before.is_hit());

    let relocation = RelocationManager::new(repo.clone(), Arc::new(BasicSanitizationPolicy::default()));
    relocation
        .handle_source_updated(&mnemex_core::auth::SourceUpdated {
            source_urn: "urn:A".to_string(),
        })
        .await
        .unwrap();

    let after = mm.smart_lookup(&query_text, &ctx, 1_000, None).await;
    assert_eq!(after, LookupResult::Miss);
}
