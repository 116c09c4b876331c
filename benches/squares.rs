/// Benchmarks for the sum of squares graph.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ghcn_summary::squares;

use rand::rngs::StdRng;
use rand::SeedableRng;

fn criterion_benchmark(c: &mut Criterion) {
    for length in [10, 10_000, 1_000_000] {
        let numbers = squares::generate_numbers(length, &mut StdRng::seed_from_u64(0));
        let name = format!("sum_of_squares({})", length);
        c.bench_function(&name, |b| {
            b.iter(|| squares::reduce_squares(squares::fan_out(black_box(&numbers))))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
