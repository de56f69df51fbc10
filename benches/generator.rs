//! Criterion benchmarks for maze generation and the reachability oracle.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mazerun::generator::{generate_with, GenParams};
use mazerun::prng::Prng;
use mazerun::reachability::{reachable, GENERATION};

/// Generation cost across grid sizes at a veteran experience level.
fn bench_generate_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_size");

    for (w, h) in [(12u32, 7u32), (18, 9), (32, 16), (64, 32)] {
        group.throughput(Throughput::Elements(u64::from(w * h)));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &(w, h), |b, &(w, h)| {
            let mut rng = Prng::new(42);
            b.iter(|| {
                let maze = generate_with(&mut rng, GenParams::new(w, h).games_played(12));
                black_box(maze.start())
            });
        });
    }

    group.finish();
}

/// Default grid, comparing the experience tiers that add extras.
fn bench_generate_experience(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_games");

    for games in [0u32, 3, 10, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(games), &games, |b, &games| {
            let mut rng = Prng::new(7);
            b.iter(|| black_box(generate_with(&mut rng, GenParams::new(18, 9).games_played(games))));
        });
    }

    group.bench_function("casual", |b| {
        let mut rng = Prng::new(7);
        b.iter(|| black_box(generate_with(&mut rng, GenParams::new(18, 9).casual(true))));
    });

    group.finish();
}

fn bench_reachability(c: &mut Criterion) {
    let maze = generate_with(&mut Prng::new(1), GenParams::new(64, 32).games_played(5));
    let (from, to) = (maze.start_entry(), maze.exit_entry());

    c.bench_function("reachable_64x32", |b| {
        b.iter(|| black_box(reachable(&maze, from, to, GENERATION)))
    });
}

criterion_group!(
    benches,
    bench_generate_sizes,
    bench_generate_experience,
    bench_reachability
);
criterion_main!(benches);
