//! Benchmarks for oscillators and noise sources.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::dsp::oscillator::{
    BrownNoise, FmOsc, NoiseKind, PinkNoise, SineLoop, SineOsc, WhiteNoise,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Sine - one sin() per sample
        let mut osc = SineOsc::new();
        group.bench_with_input(BenchmarkId::new("sine", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer), black_box(440.0), 0.0, SAMPLE_RATE);
            })
        });

        // Feedback sine - serial dependency on the previous output
        let mut osc = SineLoop::new();
        group.bench_with_input(BenchmarkId::new("sine_loop", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer), black_box(440.0), 0.3, SAMPLE_RATE);
            })
        });

        // FM - two sin() per sample
        let mut osc = FmOsc::new();
        group.bench_with_input(BenchmarkId::new("fm", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer), black_box(220.0), 0.5, 4.0, SAMPLE_RATE);
            })
        });

        let mut osc = WhiteNoise::with_seed(NoiseKind::Random, 7);
        group.bench_with_input(BenchmarkId::new("white_noise", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer));
            })
        });

        let mut osc = WhiteNoise::with_seed(NoiseKind::Lcg, 7);
        group.bench_with_input(BenchmarkId::new("white_noise_lcg", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer));
            })
        });

        // Pink - seven one-pole stages per sample
        let mut osc = PinkNoise::new();
        group.bench_with_input(BenchmarkId::new("pink_noise", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer));
            })
        });

        let mut osc = BrownNoise::new();
        group.bench_with_input(BenchmarkId::new("brown_noise", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
