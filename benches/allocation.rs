use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fitalloc::{Allocator, FitPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ARENA: usize = 1024 * 1024;

/// Benchmark filling an arena with small blocks
fn bench_allocate_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_fill");

    for policy in FitPolicy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(policy), &policy, |b, &policy| {
            b.iter(|| {
                let mut alloc = Allocator::new(ARENA, policy).unwrap();
                for _ in 0..2_000 {
                    alloc.allocate(64).unwrap();
                }
                black_box(&alloc);
            });
        });
    }

    group.finish();
}

/// Benchmark allocation + free cycles (fragmentation test)
fn bench_alloc_free_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_cycle");

    for policy in FitPolicy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(policy), &policy, |b, &policy| {
            b.iter(|| {
                let mut alloc = Allocator::new(ARENA, policy).unwrap();
                let mut rng = StdRng::seed_from_u64(7);
                let mut live = Vec::new();

                for _ in 0..500 {
                    if let Some(addr) = alloc.allocate(rng.gen_range(16..512)).unwrap() {
                        live.push(addr);
                    }
                }

                // Free every other allocation
                for (i, addr) in live.iter().enumerate() {
                    if i % 2 == 0 {
                        alloc.deallocate(*addr).unwrap();
                    }
                }

                // Re-allocate into the holes
                for _ in 0..250 {
                    alloc.allocate(rng.gen_range(16..256)).unwrap();
                }

                black_box(&alloc);
            });
        });
    }

    group.finish();
}

/// Benchmark compacting a fragmented arena
fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");

    for blocks in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &blocks, |b, &blocks| {
            b.iter_batched(
                || {
                    let mut alloc = Allocator::new(ARENA, FitPolicy::FirstFit).unwrap();
                    let addrs: Vec<_> = (0..blocks)
                        .filter_map(|_| alloc.allocate(128).unwrap())
                        .collect();
                    for addr in addrs.iter().step_by(3) {
                        alloc.deallocate(*addr).unwrap();
                    }
                    alloc
                },
                |mut alloc| black_box(alloc.compact().unwrap()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark the statistics pass (sorts the free list)
fn bench_statistics(c: &mut Criterion) {
    let mut alloc = Allocator::new(ARENA, FitPolicy::FirstFit).unwrap();
    let addrs: Vec<_> = (0..1_000).filter_map(|_| alloc.allocate(200).unwrap()).collect();
    for addr in addrs.iter().step_by(2) {
        alloc.deallocate(*addr).unwrap();
    }

    c.bench_function("statistics_500_free_blocks", |b| {
        b.iter(|| black_box(alloc.statistics().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_allocate_fill,
    bench_alloc_free_cycle,
    bench_compact,
    bench_statistics
);
criterion_main!(benches);
