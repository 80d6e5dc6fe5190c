//! Benchmarks for the ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fanout_dsp::dsp::envelope::Envelope;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let gate_on = vec![1.0f32; size];
        let gate_off = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Envelope::adsr(0.1, 0.1, 0.7, 0.3);
        env.note_on(1.0);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    env.next_sample(SAMPLE_RATE);
                    *sample = env.output();
                }
                black_box(&buffer);
            })
        });

        // Sustain phase, held by a gate
        let mut env = Envelope::adsr(0.001, 0.001, 0.7, 0.3);
        env.note_on(1.0);
        for _ in 0..200 {
            env.next_sample(SAMPLE_RATE);
        }
        group.bench_with_input(BenchmarkId::new("sustain_gated", size), &size, |b, _| {
            b.iter(|| {
                env.render_gated(black_box(&gate_on), black_box(&mut buffer), SAMPLE_RATE);
            })
        });

        // Alternating gate blocks: every iteration crosses a stage boundary
        let mut env = Envelope::adsr(0.001, 0.001, 0.7, 0.001);
        let mut high = false;
        group.bench_with_input(BenchmarkId::new("retrigger", size), &size, |b, _| {
            b.iter(|| {
                high = !high;
                let gate = if high { &gate_on } else { &gate_off };
                env.render_gated(black_box(gate), black_box(&mut buffer), SAMPLE_RATE);
            })
        });
    }

    group.finish();
}
