use std::collections::HashSet;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use mnemex_core::model::{CachedThought, Scope, GLOBAL_SCOPE_ID};
use storage::repo::Repository;
use tokio::runtime::Runtime;

fn thought(id: u128, dims: usize) -> CachedThought {
    let mut vector = vec![0.0f32; dims];
    vector[(id as usize) % dims] = 1.0;
    CachedThought {
        id,
        vector,
        entities: HashSet::new(),
        scope: Scope::Global,
        scope_id: GLOBAL_SCOPE_ID.to_string(),
        owner_id: "bench-user".to_string(),
        prompt_text: format!("prompt {id}"),
        reasoning_trace: format!("reasoning {id}"),
        final_response: format!("response {id}"),
        source_urns: vec![],
        is_stale: false,
        created_at: 1_000,
        ttl_seconds: 86_400,
        access_roles: HashSet::new(),
    }
}

fn bench_put_thought(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("repository_put_thought", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let repo = rt.block_on(Repository::open(dir.path())).unwrap();
                (dir, repo)
            },
            |(_dir, repo)| {
                rt.block_on(repo.put_thought(thought(1, 32))).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_search_vector(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let repo = rt.block_on(Repository::open(dir.path())).unwrap();
    for id in 1..=2_000u128 {
        rt.block_on(repo.put_thought(thought(id, 32))).unwrap();
    }
    let query = {
        let mut v = vec![0.0f32; 32];
        v[7] = 1.0;
        v
    };

    c.bench_function("repository_search_vector_top20_of_2000", |b| {
        b.iter(|| rt.block_on(repo.search_vector(&query, 20)));
    });
}

criterion_group!(benches, bench_put_thought, bench_search_vector);
criterion_main!(benches);
