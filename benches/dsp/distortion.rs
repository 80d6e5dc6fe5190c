//! Benchmarks for waveshaping and range folding.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::dsp::distortion::{self, Degrade, Disto};

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        // Overdriven sine so every range function has work to do
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 0.05).sin() * 1.5)
            .collect();
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("clip", size), &size, |b, _| {
            b.iter(|| {
                for (o, &x) in buffer.iter_mut().zip(&input) {
                    *o = distortion::clip(black_box(x), -0.5, 0.5);
                }
            })
        });

        // Mirror may reflect more than once per sample
        group.bench_with_input(BenchmarkId::new("mirror", size), &size, |b, _| {
            b.iter(|| {
                for (o, &x) in buffer.iter_mut().zip(&input) {
                    *o = distortion::mirror(black_box(x), -0.5, 0.5);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("wrap", size), &size, |b, _| {
            b.iter(|| {
                for (o, &x) in buffer.iter_mut().zip(&input) {
                    *o = distortion::wrap(black_box(x), -0.5, 0.5);
                }
            })
        });

        // atan2 plus one-pole lowpass
        let mut disto = Disto::new();
        group.bench_with_input(BenchmarkId::new("disto", size), &size, |b, _| {
            b.iter(|| {
                disto.render(black_box(&input), black_box(&mut buffer), 0.75, 0.5);
            })
        });

        let mut degrade = Degrade::new();
        group.bench_with_input(BenchmarkId::new("degrade", size), &size, |b, _| {
            b.iter(|| {
                degrade.render(black_box(&input), black_box(&mut buffer), 8.0, 0.25);
            })
        });
    }

    group.finish();
}
