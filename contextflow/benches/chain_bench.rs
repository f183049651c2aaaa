//! Benchmarks for filter chain execution and context propagation.

use async_trait::async_trait;
use contextflow::context::ContextStore;
use contextflow::core::{Action, HttpMethod, MethodMeta};
use contextflow::filters::{Filter, FilterChain, FilterResult, Next};
use contextflow::task::ContextTask;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

struct PassThrough(i32);

#[async_trait]
impl Filter for PassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }

    fn priority(&self) -> i32 {
        self.0
    }

    async fn filter(&self, _meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        next.run().await
    }
}

fn chain_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let meta = MethodMeta::new("bench", HttpMethod::Get, "/bench");
    let store = ContextStore::new();
    let chain = FilterChain::build((0..8).map(|p| Arc::new(PassThrough(p)) as Arc<dyn Filter>));

    c.bench_function("chain_execute_8_filters", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(chain.execute(&meta, || async { Ok(Action::empty()) }).await)
            })
        });
    });

    c.bench_function("dispatch_scope_and_chain", |b| {
        b.iter(|| {
            runtime.block_on(store.begin(async {
                store.put("x-tenant-id", "bench").ok();
                black_box(chain.execute(&meta, || async { Ok(Action::empty()) }).await)
            }))
        });
    });

    c.bench_function("context_task_map_chain", |b| {
        b.iter(|| {
            runtime.block_on(store.begin(async {
                black_box(
                    ContextTask::ready(1_u64)
                        .map(|v| v + 1)
                        .map(|v| v * 2)
                        .await,
                )
            }))
        });
    });
}

criterion_group!(benches, chain_benchmark);
criterion_main!(benches);
