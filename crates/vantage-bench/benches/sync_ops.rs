//! Criterion benchmarks for snapshot synchronization: full and filtered
//! copies at benchmark-relevant entity counts.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vantage_bench::{bench_schema, populated_store, POSITION, VELOCITY};
use vantage_core::ComponentFilter;
use vantage_world::WorldStore;

fn full_copy(c: &mut Criterion) {
    for entities in [100usize, 1_000, 10_000] {
        let src = populated_store(entities);
        let mut dst = WorldStore::new(bench_schema(), 4096);
        c.bench_function(&format!("full_copy_{entities}"), |b| {
            b.iter(|| dst.copy_from(black_box(&src), None).unwrap())
        });
    }
}

fn filtered_copy(c: &mut Criterion) {
    let filter: ComponentFilter = [POSITION, VELOCITY].into_iter().collect();
    for entities in [100usize, 1_000, 10_000] {
        let src = populated_store(entities);
        let mut dst = WorldStore::new(bench_schema(), 4096);
        c.bench_function(&format!("filtered_copy_{entities}"), |b| {
            b.iter(|| dst.copy_from(black_box(&src), Some(&filter)).unwrap())
        });
    }
}

criterion_group!(benches, full_copy, filtered_copy);
criterion_main!(benches);
