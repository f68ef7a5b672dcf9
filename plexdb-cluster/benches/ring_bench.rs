use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plexdb_cluster::ring::HashRing;
use plexdb_cluster::{RouterConfig, ShardRouter};

pub fn benchmark_ring_build(c: &mut Criterion) {
    c.bench_function("ring_build_4x150", |b| {
        b.iter(|| HashRing::build(black_box(4), black_box(150)))
    });
}

pub fn benchmark_ring_locate(c: &mut Criterion) {
    let ring = HashRing::build(16, 150);
    let keys: Vec<String> = (0..1024).map(|i| format!("user-{i}")).collect();
    let mut next = 0usize;

    c.bench_function("ring_locate", |b| {
        b.iter(|| {
            next = (next + 1) % keys.len();
            ring.locate(black_box(&keys[next]))
        })
    });
}

pub fn benchmark_resolve_with_failover(c: &mut Criterion) {
    let router = ShardRouter::new(RouterConfig::default());
    router.update_health("shard-0", false, None);

    c.bench_function("resolve_with_failover", |b| {
        b.iter(|| router.resolve_with_failover("user", black_box("user-42")).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_ring_build,
    benchmark_ring_locate,
    benchmark_resolve_with_failover
);
criterion_main!(benches);
