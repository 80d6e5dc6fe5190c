//! Benchmarks for small object chains.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::objects::{
    Delay, DelayParams, Disto, DistoParams, Fm, FmParams, Noise, NoiseParams, Pan, PanParams,
    ProxyExt, Svf, SvfParams,
};
use fanout_dsp::Arg;

use super::context;
use crate::BLOCK_SIZES;

pub fn bench_patches(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/patches");

    for &size in BLOCK_SIZES {
        // === FM VOICE ===
        // fm → lowpass → pan, the patch the fanout binary plays
        let ctx = context(size);
        let fm = Fm::new(&ctx, FmParams {
            carrier: Arg::from(220.0),
            ratio: Arg::from(0.5),
            index: Arg::from(4.0),
            mul: Arg::from(0.2),
            ..Default::default()
        })
        .unwrap();
        let svf = Svf::new(&ctx, &fm, SvfParams {
            freq: Arg::from(1200.0),
            q: Arg::from(2.0),
            ..Default::default()
        })
        .unwrap();
        let mut pan = Pan::new(&ctx, &svf, PanParams::default()).unwrap();
        pan.out().unwrap();

        let mut buffer = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("fm_voice", size), &size, |b, _| {
            b.iter(|| {
                ctx.process_block(black_box(&mut buffer));
            })
        });
        drop((pan, svf, fm));

        // === NOISE ECHO ===
        // stereo noise → disto → feedback delay
        let ctx = context(size);
        let noise = Noise::new(&ctx, NoiseParams {
            mul: vec![0.1, 0.1].into(),
            ..Default::default()
        })
        .unwrap();
        let disto = Disto::new(&ctx, &noise, DistoParams {
            drive: Arg::from(0.8),
            ..Default::default()
        })
        .unwrap();
        let mut delay = Delay::new(&ctx, &disto, DelayParams {
            delay: vec![0.25, 0.375].into(),
            feedback: Arg::from(0.6),
            ..Default::default()
        })
        .unwrap();
        delay.out().unwrap();

        let mut buffer = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("noise_echo", size), &size, |b, _| {
            b.iter(|| {
                ctx.process_block(black_box(&mut buffer));
            })
        });
        drop((delay, disto, noise));
    }

    group.finish();
}
