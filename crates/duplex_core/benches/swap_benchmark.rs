//! # Swap Benchmark
//!
//! Measures one full tick → frame cycle on a populated store:
//! 1. Simulation edits a share of the entities
//! 2. Render opens a frame (swap + dirty re-sync) and closes it
//!
//! The re-sync cost should scale with the dirty share, not the store size.

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use duplex_core::testing::RenderWorker;
use duplex_core::{Handle, StateKind, StateStore, ThreadRegistry};

const ENTITY_COUNT: usize = 100_000;

struct Particle;

impl StateKind for Particle {
    const NAME: &'static str = "particle";
    type Static = u32;
    type Dynamic = [f32; 4];
    type Config = u32;

    fn split(seed: u32) -> (u32, [f32; 4]) {
        (seed, [seed as f32; 4])
    }
}

fn bench_tick_frame_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_frame_cycle");

    for dirty_pct in [1, 10, 50, 100] {
        let registry = Arc::new(ThreadRegistry::new());
        let mut sim = registry.register_sim();
        let render = RenderWorker::spawn(registry);
        let store = Arc::new(StateStore::<Particle>::new(ENTITY_COUNT));

        store.begin_tick(&mut sim);
        let handles: Vec<Handle<Particle>> =
            (0..ENTITY_COUNT as u32).map(|i| store.create(&sim, i)).collect();
        store.end_tick(&mut sim);

        let dirty_count = ENTITY_COUNT * dirty_pct / 100;
        group.throughput(Throughput::Elements(dirty_count as u64));

        group.bench_with_input(
            BenchmarkId::new("dirty_pct", dirty_pct),
            &dirty_count,
            |b, &dirty_count| {
                b.iter(|| {
                    store.begin_tick(&mut sim);
                    for &h in &handles[..dirty_count] {
                        store.edit_dynamic(&mut sim, h)[0] += 1.0;
                    }
                    store.end_tick(&mut sim);

                    let frame_store = Arc::clone(&store);
                    let first = handles[0];
                    let seen = render.run(move |rend| {
                        frame_store.begin_frame(rend);
                        let x = frame_store.read_dynamic_rend(rend, first)[0];
                        frame_store.end_frame(rend);
                        x
                    });
                    black_box(seen)
                });
            },
        );
    }

    group.finish();
}

fn bench_read_front(c: &mut Criterion) {
    let registry = Arc::new(ThreadRegistry::new());
    let mut sim = registry.register_sim();
    let render = RenderWorker::spawn(registry);
    let store = Arc::new(StateStore::<Particle>::new(ENTITY_COUNT));

    store.begin_tick(&mut sim);
    for i in 0..ENTITY_COUNT as u32 {
        store.create(&sim, i);
    }
    store.end_tick(&mut sim);

    c.bench_function("read_front_100k", |b| {
        b.iter(|| {
            let frame_store = Arc::clone(&store);
            let sum = render.run(move |rend| {
                frame_store.begin_frame(rend);
                let handles: Vec<_> = frame_store.handles_rend(rend).collect();
                let sum: f32 = handles
                    .into_iter()
                    .map(|h| frame_store.read_dynamic_rend(rend, h)[0])
                    .sum();
                frame_store.end_frame(rend);
                sum
            });
            black_box(sum)
        });
    });
}

criterion_group!(benches, bench_tick_frame_cycle, bench_read_front);
criterion_main!(benches);
