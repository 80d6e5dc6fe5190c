//! Benchmarks for wide objects created from list arguments.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::objects::{ProxyExt, Sine, SineParams};

use super::context;

const STREAM_COUNTS: &[usize] = &[1, 8, 32, 128];

pub fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/broadcast");
    let size = 256;

    for &streams in STREAM_COUNTS {
        // Additive cluster: one sine unit per list element
        let ctx = context(size);
        let freqs: Vec<f32> = (0..streams).map(|i| 110.0 * (i + 1) as f32).collect();
        let mut sines = Sine::new(&ctx, SineParams {
            freq: freqs.into(),
            mul: vec![1.0 / streams as f32].into(),
            ..Default::default()
        })
        .unwrap();
        sines.out().unwrap();

        let mut buffer = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("sine_cluster", streams), &streams, |b, _| {
            b.iter(|| {
                ctx.process_block(black_box(&mut buffer));
            })
        });
        drop(sines);

        // Creation cost of the expansion itself, units released on drop
        let ctx = context(size);
        let freqs: Vec<f32> = (0..streams).map(|i| 110.0 * (i + 1) as f32).collect();
        group.bench_with_input(BenchmarkId::new("create", streams), &streams, |b, _| {
            b.iter(|| {
                let sines = Sine::new(&ctx, SineParams {
                    freq: freqs.clone().into(),
                    ..Default::default()
                })
                .unwrap();
                black_box(sines);
            })
        });
    }

    group.finish();
}
