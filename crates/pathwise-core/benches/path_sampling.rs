//! Path Sampling Benchmarks
//!
//! Measure the cost of the dyadic construction as resolution grows, and the
//! gap between the Markov bridge sampler and full Gaussian conditioning.
//!
//! Run with: cargo bench --bench path_sampling

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pathwise_core::{BrownianAssembler, ChainingConfig};

fn bench_bridge_sampling_by_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge_sampling");

    for level in [6u32, 8, 10, 12, 14] {
        let bm = BrownianAssembler::new(
            10.0,
            ChainingConfig::default().with_max_level(level).with_beta(0.4),
        )
        .unwrap();
        let points = (1u64 << level) + 1;
        group.throughput(Throughput::Elements(points));

        group.bench_with_input(BenchmarkId::new("level", level), &bm, |b, bm| {
            let mut seed = 0u64;
            b.iter(|| {
                seed = seed.wrapping_add(1);
                black_box(bm.sample_path(seed).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_conditional_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditional_sampling");
    // Gaussian conditioning is cubic in materialized coordinates; keep the
    // levels modest.
    group.sample_size(10);

    for level in [3u32, 4, 5] {
        let bm = BrownianAssembler::new(
            1.0,
            ChainingConfig::default().with_max_level(level).with_beta(0.4),
        )
        .unwrap();
        let points = (1u64 << level) + 1;
        group.throughput(Throughput::Elements(points));

        group.bench_with_input(BenchmarkId::new("level", level), &bm, |b, bm| {
            let mut seed = 0u64;
            b.iter(|| {
                seed = seed.wrapping_add(1);
                black_box(bm.sample_path_conditional(seed).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_batch_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_sampling");
    group.sample_size(10);

    let bm = BrownianAssembler::new(
        10.0,
        ChainingConfig::default().with_max_level(8).with_beta(0.4),
    )
    .unwrap();

    for count in [64usize, 256, 1024] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("paths", count), &count, |b, &count| {
            b.iter(|| black_box(bm.sample_paths(count, 42).unwrap()));
        });
    }

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_evaluation");

    let bm = BrownianAssembler::new(
        10.0,
        ChainingConfig::default().with_max_level(12).with_beta(0.4),
    )
    .unwrap();
    let path = bm.sample_path(7).unwrap();

    group.bench_function("evaluate_interior", |b| {
        let mut t = 0.0f64;
        b.iter(|| {
            t = (t + 0.137) % 10.0;
            black_box(path.evaluate(t).unwrap())
        });
    });

    group.bench_function("max_increment_ratio", |b| {
        b.iter(|| black_box(path.max_increment_ratio(0.49)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bridge_sampling_by_level,
    bench_conditional_sampling,
    bench_batch_sampling,
    bench_evaluation
);
criterion_main!(benches);
