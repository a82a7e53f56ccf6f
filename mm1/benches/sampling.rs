//! Benchmarks for exponential sampling and buffer sizing.
//!
//! - Raw draws from the interarrival and service distributions
//! - Capacity computation across utilizations

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mm1::dist::{ExpSampler, SeedStreams};
use mm1::QueueStats;

fn bench_exp_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("exp_sampling");
    group.throughput(Throughput::Elements(1));

    for rate in [0.5_f64, 1.0, 1000.0] {
        group.bench_with_input(BenchmarkId::new("sample", rate), &rate, |b, &rate| {
            let mut sampler = ExpSampler::new(rate, 42).expect("positive rate");
            b.iter(|| black_box(sampler.sample()));
        });
    }

    group.bench_function("sample_secs", |b| {
        let mut sampler = ExpSampler::new(2.0, 42).expect("positive rate");
        b.iter(|| black_box(sampler.sample_secs()));
    });

    group.bench_function("seed_streams", |b| {
        let mut seeds = SeedStreams::from_seed(7);
        b.iter(|| black_box(seeds.next_seed()));
    });

    group.finish();
}

fn bench_buffer_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_capacity");

    for rho in [0.1_f64, 0.5, 0.9, 0.999] {
        let stats = QueueStats::new(rho, 1.0).expect("stable queue");
        group.bench_with_input(BenchmarkId::from_parameter(rho), &stats, |b, stats| {
            b.iter(|| black_box(stats.buffer_capacity(black_box(10.0))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_exp_sampling, bench_buffer_capacity);
criterion_main!(benches);
