//! Benchmarks for the delay line.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::dsp::delay::DelayLine;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    let delay_times: &[f32] = &[
        480.0,    // 10ms at 48kHz
        4800.0,   // 100ms at 48kHz
        48000.0,  // 1 second at 48kHz
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut buffer = vec![0.0f32; size];

        for &delay_samples in delay_times {
            let delay_ms = delay_samples / 48.0;
            let mut delay = DelayLine::new(48_000);
            group.bench_with_input(
                BenchmarkId::new(format!("render_{}ms", delay_ms as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        delay.render(
                            black_box(&input),
                            black_box(&mut buffer),
                            black_box(delay_samples),
                            0.5,
                        );
                    })
                },
            );
        }

        // Fractional, modulated delay time (chorus-like)
        let mut delay = DelayLine::new(48_000);
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, _| {
            b.iter(|| {
                for (i, (o, &x)) in buffer.iter_mut().zip(&input).enumerate() {
                    let delay_time = 480.0 + (i as f32 * 0.1).sin() * 48.0;
                    *o = delay.next_sample(x, black_box(delay_time), 0.3);
                }
            })
        });
    }

    group.finish();
}
