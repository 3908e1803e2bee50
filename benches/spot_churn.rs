//! Spot Churn Benchmarks
//!
//! Measures spot pool updates under touch churn (contacts landing and
//! lifting every frame) and a full controller render pass.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lamco_pointer::config::PointerConfig;
use lamco_pointer::pointer::spot::{SpotManager, SpotPolicy};
use lamco_pointer::pointer::{IdBits, PointerController, PointerCoords, Presentation, Viewport};
use lamco_pointer::sim::{RecordingSpriteController, StaticIconPolicy};
use tokio::time::Instant;

/// Touch frame with `contacts` contacts spread across a 1080p display
fn generate_coords(contacts: usize, frame: usize) -> Vec<PointerCoords> {
    (0..contacts)
        .map(|i| {
            PointerCoords::new(
                ((i * 160 + frame * 3) % 1920) as f32,
                ((i * 90 + frame * 2) % 1080) as f32,
                if (frame + i) % 4 == 0 { 0.0 } else { 1.0 },
            )
        })
        .collect()
}

/// Id mask that lifts one contact and lands another every frame
fn churn_mask(contacts: usize, frame: usize) -> IdBits {
    let mut bits = IdBits::empty();
    for i in 0..contacts {
        bits.mark(((i + frame) % 32) as u32);
    }
    bits
}

/// Benchmark `SpotManager::upsert` with rotating ids
fn bench_upsert_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spot_upsert_churn");
    let index: Vec<u32> = (0..32).map(|id| id % 10).collect();

    for contacts in [1usize, 5, 10] {
        let coords = generate_coords(10, 0);
        group.throughput(Throughput::Elements(contacts as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(contacts),
            &contacts,
            |b, &contacts| {
                let mut manager = SpotManager::new(SpotPolicy {
                    max_spots: 12,
                    max_recycled: 12,
                    pressure_scales: false,
                    min_scale: 0.5,
                });
                let mut frame = 0usize;
                b.iter(|| {
                    frame += 1;
                    let changes =
                        manager.upsert(0, &coords, &index, churn_mask(contacts, frame));
                    manager.advance_fades(Duration::from_millis(16), Duration::from_millis(200));
                    drop(manager.take_retired());
                    black_box(changes)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a full `set_spots` + render pass against the recording compositor
fn bench_controller_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_set_spots_render");

    for contacts in [1usize, 5, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(contacts),
            &contacts,
            |b, &contacts| {
                let (pointer, mut wakes) = PointerController::new(
                    Arc::new(StaticIconPolicy::new()),
                    Arc::new(RecordingSpriteController::new()),
                    PointerConfig::default(),
                )
                .unwrap();
                pointer.set_display_viewport(Viewport::new(0, 0, 0, 1920, 1080));
                pointer.set_presentation(Presentation::Spot);
                let index: Vec<u32> = (0..32).collect();
                let mut frame = 0usize;

                b.iter(|| {
                    frame += 1;
                    let coords = generate_coords(32, frame);
                    pointer.set_spots(&coords, &index, churn_mask(contacts, frame), 0);
                    let now = Instant::now();
                    pointer.animate(now);
                    pointer.render(now);
                    while wakes.try_recv().is_ok() {}
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_upsert_churn, bench_controller_render);
criterion_main!(benches);
