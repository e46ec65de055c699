//! Criterion benchmarks for the habitat layout engine.
//!
//! Three benchmark groups:
//! - `scoring`: evaluate packed layouts of increasing size
//! - `optimizer`: a full default-length run on the scattered crew layout
//! - `snapshot`: take and restore a packed layout snapshot

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use habitat_core::optimizer::{Optimizer, OptimizerConfig};
use habitat_core::scoring::evaluate;
use habitat_core::snapshot;
use habitat_core::test_utils::*;
use std::hint::black_box;

fn bench_scoring(c: &mut Criterion) {
    let constraints = habitat_constraints();
    let mut group = c.benchmark_group("scoring");
    for count in [8, 24, 48] {
        let layout = packed_layout(count);
        group.bench_with_input(BenchmarkId::from_parameter(layout.len()), &layout, |b, layout| {
            b.iter(|| evaluate(black_box(layout), &constraints));
        });
    }
    group.finish();
}

fn bench_optimizer(c: &mut Criterion) {
    let constraints = habitat_constraints();
    let layout = scattered_crew_layout();
    let mut group = c.benchmark_group("optimizer");
    group.sample_size(20);
    group.bench_function("scattered_800_iterations", |b| {
        b.iter(|| {
            Optimizer::new(OptimizerConfig::default()).run(black_box(&layout), &constraints, None)
        });
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let layout = packed_layout(48);
    let bytes = snapshot::take_snapshot(&layout).unwrap();
    let mut group = c.benchmark_group("snapshot");
    group.bench_function("take", |b| {
        b.iter(|| snapshot::take_snapshot(black_box(&layout)).unwrap());
    });
    group.bench_function("restore", |b| {
        b.iter(|| snapshot::restore_snapshot(black_box(&bytes)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_scoring, bench_optimizer, bench_snapshot);
criterion_main!(benches);
