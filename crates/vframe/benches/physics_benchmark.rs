//! # Physics Tick Benchmark
//!
//! The tick runs every pair of bounds, so cost grows with the square of the
//! body count. These numbers show where a scene stops fitting a 60 Hz budget.
//!
//! Run with: `cargo bench --package vframe --bench physics_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vframe::{
    Color, EntityDesc, GraphicsBackend, Physics, Rect, Renderer, Scene, Sprite, Vector,
};

fn scattered(count: usize) -> Scene {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut scene = Scene::default();
    let extent = (count as f32).sqrt() * 3.0;

    for _ in 0..count {
        let position = Vector::new(rng.gen_range(0.0..extent), rng.gen_range(0.0..extent));
        let desc = EntityDesc::new(Physics::new(0.5, 0.01, rng.gen_range(0.5..2.0))).at(position);
        if let Ok(entity) = scene.create_entity(desc) {
            let velocity = Vector::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let _ = scene.set_velocity(entity, velocity);
        }
    }
    scene
}

/// Benchmark: one tick at increasing body counts.
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_tick");

    for count in [64_usize, 256, 1024] {
        let mut scene = scattered(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(scene.tick()));
        });
    }

    group.finish();
}

struct NullBackend;

impl GraphicsBackend for NullBackend {
    fn draw_sprite(&mut self, sprite: &Sprite) {
        black_box(sprite);
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        black_box((rect, color));
    }
}

/// Benchmark: entity pass including the world transform fold and layer sort.
fn bench_render_entities(c: &mut Criterion) {
    let scene = scattered(1024);
    let mut renderer = Renderer::new();
    let mut backend = NullBackend;

    c.bench_function("render_entities_1k", |b| {
        b.iter(|| black_box(renderer.render_entities(&scene, &mut backend)));
    });
}

criterion_group!(benches, bench_tick, bench_render_entities);
criterion_main!(benches);
