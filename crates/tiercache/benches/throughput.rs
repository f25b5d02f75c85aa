//! Benchmarks for tiercache throughput and operations

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use tiercache::{CacheConfig, CacheMode, MemoryRemote, ServerAddress, TieredCache};
use tokio::runtime::Runtime;

fn local_cache(rt: &Runtime) -> TieredCache<u64> {
    let config = CacheConfig::builder()
        .namespace_id("bench")
        .build()
        .unwrap();
    rt.block_on(TieredCache::builder(config).build()).unwrap()
}

fn hybrid_cache(rt: &Runtime) -> TieredCache<u64> {
    let config = CacheConfig::builder()
        .mode(CacheMode::SingleRemote)
        .endpoint(ServerAddress::new("127.0.0.1", 6379))
        .local_cache(10_000)
        .namespace_id("bench")
        .build()
        .unwrap();
    rt.block_on(
        TieredCache::builder(config)
            .remote_store(MemoryRemote::new())
            .build(),
    )
    .unwrap()
}

fn bench_replace(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let local = local_cache(&rt);
    let hybrid = hybrid_cache(&rt);

    let mut group = c.benchmark_group("replace");
    group.throughput(Throughput::Elements(1));

    group.bench_function("local", |b| {
        b.iter(|| {
            rt.block_on(async {
                local.replace(black_box("key"), black_box(42)).await.unwrap();
            });
        });
    });

    group.bench_function("hybrid", |b| {
        b.iter(|| {
            rt.block_on(async {
                hybrid.replace(black_box("key"), black_box(42)).await.unwrap();
            });
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let local = local_cache(&rt);
    let hybrid = hybrid_cache(&rt);

    // Pre-populate
    rt.block_on(async {
        local.store("key", 42).await.unwrap();
        hybrid.store("key", 42).await.unwrap();
    });

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("local_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(local.get(black_box("key")).await.unwrap());
            });
        });
    });

    group.bench_function("hybrid_validated_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(hybrid.get(black_box("key")).await.unwrap());
            });
        });
    });

    group.bench_function("hybrid_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(hybrid.get(black_box("nonexistent")).await.unwrap());
            });
        });
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let hybrid = hybrid_cache(&rt);
    let entries: Vec<(String, u64)> = (0..100).map(|i| (format!("key:{}", i), i)).collect();

    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(entries.len() as u64));

    group.bench_function("store_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                hybrid
                    .store_batch(entries.clone(), Duration::from_secs(5))
                    .await
                    .unwrap();
            });
        });
    });

    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = hybrid_cache(&rt);

    rt.block_on(async {
        for i in 0..100u64 {
            cache.store(format!("key:{}", i), i).await.unwrap();
        }
    });

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(100));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..100 {
                    i = i.wrapping_add(1);
                    if i % 5 == 0 {
                        // 20% writes
                        cache.replace(format!("key:{}", i % 100), i).await.unwrap();
                    } else {
                        // 80% reads
                        black_box(cache.get(format!("key:{}", i % 100)).await.unwrap());
                    }
                }
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_replace, bench_get, bench_batch, bench_mixed_workload);
criterion_main!(benches);
