//! # Tank Allocator Benchmark
//!
//! Pooled allocation must beat the system allocator for object-sized blocks.
//!
//! Run with: `cargo bench --package vframe_core --bench tank_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vframe_core::memory::{default_layout, TankAllocator};

/// Blocks held live at once in the churn benchmarks.
const LIVE_BLOCKS: usize = 128;

/// Benchmark: allocate then free one block, per size class.
fn bench_alloc_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("tank_alloc_free");

    for size in [16_usize, 40, 88, 200] {
        group.bench_with_input(BenchmarkId::new("tank", size), &size, |b, &size| {
            let mut tanks = TankAllocator::new(&default_layout(), 1 << 20);
            b.iter(|| {
                let block = tanks.allocate(black_box(size), true).ok();
                if let Some(block) = block {
                    let _ = tanks.free(block, true);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("heap", size), &size, |b, &size| {
            b.iter(|| black_box(vec![0u8; black_box(size)]));
        });
    }

    group.finish();
}

/// Benchmark: keep a window of live blocks and recycle the oldest.
fn bench_churn(c: &mut Criterion) {
    c.bench_function("tank_churn_128_live", |b| {
        let mut tanks = TankAllocator::new(&default_layout(), 1 << 20);
        let mut live = Vec::with_capacity(LIVE_BLOCKS);
        for _ in 0..LIVE_BLOCKS {
            if let Ok(block) = tanks.allocate(40, true) {
                live.push(block);
            }
        }
        let mut cursor = 0;

        b.iter(|| {
            let _ = tanks.free(live[cursor], false);
            if let Ok(block) = tanks.allocate(40, false) {
                live[cursor] = block;
            }
            cursor = (cursor + 1) % live.len();
        });
    });
}

/// Benchmark: zeroed vs unzeroed reuse.
fn bench_zeroing(c: &mut Criterion) {
    let mut group = c.benchmark_group("tank_zeroing");

    for zero in [true, false] {
        group.bench_with_input(BenchmarkId::from_parameter(zero), &zero, |b, &zero| {
            let mut tanks = TankAllocator::new(&default_layout(), 1 << 20);
            b.iter(|| {
                if let Ok(block) = tanks.allocate(256, zero) {
                    let _ = tanks.free(block, zero);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_alloc_free, bench_churn, bench_zeroing);
criterion_main!(benches);
