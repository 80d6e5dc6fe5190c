//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::dsp::filter::{FilterType, SVFilter};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut buffer = vec![0.0f32; size];

        for (name, kind) in [
            ("lowpass", FilterType::LowPass),
            ("highpass", FilterType::HighPass),
            ("bandpass", FilterType::BandPass),
            ("notch", FilterType::Notch),
        ] {
            let mut filter = SVFilter::new(kind, 1000.0, 2.0);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    filter.render(black_box(&input), black_box(&mut buffer), SAMPLE_RATE);
                })
            });
        }

        // Cutoff moving every block, as under a slider or LFO
        let mut filter = SVFilter::lowpass(1000.0);
        let mut cutoff = 200.0f32;
        group.bench_with_input(BenchmarkId::new("lowpass_sweep", size), &size, |b, _| {
            b.iter(|| {
                cutoff = if cutoff > 8000.0 { 200.0 } else { cutoff * 1.01 };
                filter.set_cutoff(cutoff);
                filter.render(black_box(&input), black_box(&mut buffer), SAMPLE_RATE);
            })
        });
    }

    group.finish();
}
