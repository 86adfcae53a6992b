//! Engine Benchmarks
//!
//! Cost of the analysis stages over a full 30 second correlation window.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stemsync::audio::AudioBuffer;
use stemsync::{Aligner, Balancer};

fn benchmark_alignment(c: &mut Criterion) {
    let reference = AudioBuffer::sine_wave(440.0, 30.0, 44100);
    let target = reference.shifted(8820, reference.num_frames());
    let aligner = Aligner::default();

    c.bench_function("align_30s_mono", |b| {
        b.iter(|| aligner.estimate_offset(black_box(&reference), black_box(&target)).unwrap())
    });
}

fn benchmark_balance(c: &mut Criterion) {
    let instrumental = AudioBuffer::sine_wave(220.0, 30.0, 44100);
    let vocal = AudioBuffer::sine_wave(880.0, 30.0, 44100);
    let balancer = Balancer::default();

    c.bench_function("balance_30s_mono", |b| {
        b.iter(|| balancer.analyze(black_box(&instrumental), black_box(&vocal)).unwrap())
    });
}

criterion_group!(benches, benchmark_alignment, benchmark_balance);
criterion_main!(benches);
