use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Phase Accumulators
==================

Every periodic generator here is driven by a normalized phase in [0, 1):

  phase[n+1] = (phase[n] + freq / sample_rate) mod 1

The waveform is then a function of phase:

  Phasor     y = phase
  Sine       y = sin(2π · phase)
  SineLoop   y = sin(2π · (phase + feedback · y_prev))
  FM         y = sin(2π · carrier_phase)
             where the carrier phase advances by (carrier + m) / sample_rate
             and   m = carrier · ratio · index · sin(2π · modulator_phase)

The `phase` parameter of Sine and Phasor is an offset added at lookup time,
so changing it shifts the waveform without resetting the accumulator.

SineLoop feeds its own output back into the lookup position. Small feedback
values brighten the tone; values near 1 approach a sawtooth-like spectrum.

FM follows Chowning: the modulator runs at carrier · ratio, and the index
scales the modulator amplitude relative to its own frequency.

Cross FM lets both operators modulate each other from their previous
outputs, with m = carrier · ratio:

  carrier freq    = carrier + ind2 · m · y_mod
  modulator freq  = m + ind1 · carrier · y_car

LFO shapes are bipolar functions of phase bent by `sharp` in [0, 1]. At
sharp = 0 every shape is close to a sine; at 1 it reaches its hard form.
*/

#[derive(Debug, Clone, Copy, Default)]
pub struct Phase {
    value: f32,
}

impl Phase {
    pub fn new() -> Self {
        Self { value: 0.0 }
    }

    /// Current phase, then advance by one sample.
    #[inline]
    pub fn next(&mut self, freq: f32, sample_rate: f32) -> f32 {
        let current = self.value;
        self.value = (self.value + freq / sample_rate).rem_euclid(1.0);
        current
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Phasor {
    phase: Phase,
}

impl Phasor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, out: &mut [f32], freq: f32, offset: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = (self.phase.next(freq, sample_rate) + offset).rem_euclid(1.0);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SineOsc {
    phase: Phase,
}

impl SineOsc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, out: &mut [f32], freq: f32, offset: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            let phase = self.phase.next(freq, sample_rate) + offset;
            *sample = (TAU * phase).sin();
        }
    }

    pub fn reset(&mut self) {
        self.phase.reset();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SineLoop {
    phase: Phase,
    last: f32,
}

impl SineLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, out: &mut [f32], freq: f32, feedback: f32, sample_rate: f32) {
        let feedback = feedback.clamp(0.0, 1.0);
        for sample in out.iter_mut() {
            let phase = self.phase.next(freq, sample_rate) + self.last * feedback;
            self.last = (TAU * phase).sin();
            *sample = self.last;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FmOsc {
    carrier: Phase,
    modulator: Phase,
}

impl FmOsc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, out: &mut [f32], carrier: f32, ratio: f32, index: f32, sample_rate: f32) {
        let mod_freq = carrier * ratio;
        let mod_amp = mod_freq * index;
        for sample in out.iter_mut() {
            let m = mod_amp * (TAU * self.modulator.next(mod_freq, sample_rate)).sin();
            *sample = (TAU * self.carrier.next(carrier + m, sample_rate)).sin();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrossFmOsc {
    carrier: Phase,
    modulator: Phase,
    car_out: f32,
    mod_out: f32,
}

impl CrossFmOsc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, out: &mut [f32], carrier: f32, ratio: f32, ind1: f32, ind2: f32, sample_rate: f32) {
        let mod_freq = carrier * ratio;
        for sample in out.iter_mut() {
            let car_freq = carrier + self.mod_out * ind2 * mod_freq;
            let mod_inst = mod_freq + self.car_out * ind1 * carrier;
            self.car_out = (TAU * self.carrier.next(car_freq, sample_rate)).sin();
            self.mod_out = (TAU * self.modulator.next(mod_inst, sample_rate)).sin();
            *sample = self.car_out;
        }
    }
}

/// Waveform of an [`Lfo`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    #[default]
    SawUp,
    SawDown,
    Square,
    Triangle,
    Pulse,
    BipolarPulse,
    /// A new random level every cycle
    SampleHold,
    /// Sine with a phase-modulated shape
    ModSine,
}

impl LfoShape {
    /// Shape for the numeric `type` attribute. Out-of-range indices clamp.
    pub fn from_index(index: i64) -> Self {
        match index.clamp(0, 7) {
            0 => LfoShape::SawUp,
            1 => LfoShape::SawDown,
            2 => LfoShape::Square,
            3 => LfoShape::Triangle,
            4 => LfoShape::Pulse,
            5 => LfoShape::BipolarPulse,
            6 => LfoShape::SampleHold,
            _ => LfoShape::ModSine,
        }
    }
}

/// Band-unlimited low frequency oscillator.
pub struct Lfo {
    phase: Phase,
    last_phase: f32,
    rng: fastrand::Rng,
    held: f32,
    target: f32,
    pub shape: LfoShape,
}

impl Lfo {
    pub fn new(shape: LfoShape) -> Self {
        Self::with_rng(shape, fastrand::Rng::new())
    }

    pub fn with_seed(shape: LfoShape, seed: u64) -> Self {
        Self::with_rng(shape, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(shape: LfoShape, mut rng: fastrand::Rng) -> Self {
        let target = rng.f32() * 2.0 - 1.0;
        Self {
            phase: Phase::new(),
            last_phase: 0.0,
            rng,
            held: target,
            target,
            shape,
        }
    }

    #[inline]
    fn saw(p: f32, sharp: f32) -> f32 {
        let fall = (0.5 * (1.0 - sharp)).max(1e-3);
        let rise = 1.0 - fall;
        if p < rise {
            -1.0 + 2.0 * p / rise
        } else {
            1.0 - 2.0 * (p - rise) / fall
        }
    }

    pub fn render(&mut self, out: &mut [f32], freq: f32, sharp: f32, sample_rate: f32) {
        let sharp = sharp.clamp(0.0, 1.0);
        let drive = 1.0 + 49.0 * sharp;
        let exponent = 1.0 + 15.0 * sharp;
        for sample in out.iter_mut() {
            let p = self.phase.next(freq, sample_rate);
            let s = (TAU * p).sin();
            *sample = match self.shape {
                LfoShape::SawUp => Self::saw(p, sharp),
                LfoShape::SawDown => -Self::saw(p, sharp),
                LfoShape::Square => (drive * s).tanh() / drive.tanh(),
                LfoShape::Triangle => {
                    let smooth = (TAU * p).cos();
                    let tri = 4.0 * (p - 0.5).abs() - 1.0;
                    smooth + sharp * (tri - smooth)
                }
                LfoShape::Pulse => 2.0 * s.max(0.0).powf(exponent) - 1.0,
                LfoShape::BipolarPulse => s.signum() * s.abs().powf(exponent),
                LfoShape::SampleHold => {
                    if p < self.last_phase {
                        self.target = self.rng.f32() * 2.0 - 1.0;
                    }
                    if sharp >= 1.0 {
                        self.held = self.target;
                    } else {
                        self.held += (self.target - self.held) * sharp.max(1e-3);
                    }
                    self.held
                }
                LfoShape::ModSine => (TAU * (p + sharp * 0.25 * (2.0 * TAU * p).sin())).sin(),
            };
            self.last_phase = p;
        }
    }

    pub fn reset(&mut self) {
        self.phase.reset();
        self.last_phase = 0.0;
    }
}

/// Generation algorithm for white noise.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseKind {
    /// General purpose generator
    #[default]
    Random,
    /// Linear congruential generator, cheaper and lower quality
    Lcg,
}

impl NoiseKind {
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => NoiseKind::Lcg,
            _ => NoiseKind::Random,
        }
    }
}

/// White noise in [-0.99, 0.99).
pub struct WhiteNoise {
    rng: fastrand::Rng,
    lcg: u32,
    pub kind: NoiseKind,
}

impl WhiteNoise {
    pub fn new(kind: NoiseKind) -> Self {
        let mut rng = fastrand::Rng::new();
        let lcg = rng.u32(..);
        Self { rng, lcg, kind }
    }

    pub fn with_seed(kind: NoiseKind, seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            lcg: seed as u32,
            kind,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let unit = match self.kind {
            NoiseKind::Random => self.rng.f32(),
            NoiseKind::Lcg => {
                self.lcg = self.lcg.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (self.lcg >> 8) as f32 / (1u32 << 24) as f32
            }
        };
        unit * 1.98 - 0.99
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

/// Paul Kellet's refined pink noise filter over white noise.
pub struct PinkNoise {
    white: WhiteNoise,
    b: [f32; 7],
}

impl PinkNoise {
    pub fn new() -> Self {
        Self {
            white: WhiteNoise::new(NoiseKind::Random),
            b: [0.0; 7],
        }
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let w = self.white.next_sample();
            let b = &mut self.b;
            b[0] = 0.99886 * b[0] + w * 0.0555179;
            b[1] = 0.99332 * b[1] + w * 0.0750759;
            b[2] = 0.96900 * b[2] + w * 0.1538520;
            b[3] = 0.86650 * b[3] + w * 0.3104856;
            b[4] = 0.55000 * b[4] + w * 0.5329522;
            b[5] = -0.7616 * b[5] - w * 0.0168980;
            let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + w * 0.5362;
            b[6] = w * 0.115926;
            *sample = pink * 0.11;
        }
    }
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new()
    }
}

/// Leaky integrated white noise (-6 dB per octave).
pub struct BrownNoise {
    white: WhiteNoise,
    last: f32,
}

impl BrownNoise {
    pub fn new() -> Self {
        Self {
            white: WhiteNoise::new(NoiseKind::Random),
            last: 0.0,
        }
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let w = self.white.next_sample();
            self.last = (self.last + 0.02 * w) / 1.02;
            *sample = self.last * 3.5;
        }
    }
}

impl Default for BrownNoise {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn phase_wraps_into_unit_range() {
        let mut phase = Phase::new();
        for _ in 0..1000 {
            let p = phase.next(7_000.0, SAMPLE_RATE);
            assert!((0.0..1.0).contains(&p), "phase out of range: {}", p);
        }
    }

    #[test]
    fn phasor_ramps_once_per_period() {
        let mut phasor = Phasor::new();
        let mut out = vec![0.0; 100];
        phasor.render(&mut out, 480.0, 0.0, SAMPLE_RATE);

        assert!(out[0].abs() < 1e-6);
        assert!((out[50] - 0.5).abs() < 1e-3);
        assert!(out[99] > 0.98);
    }

    #[test]
    fn sine_offset_shifts_waveform() {
        let mut osc = SineOsc::new();
        let mut out = vec![0.0; 1];
        osc.render(&mut out, 1_000.0, 0.25, SAMPLE_RATE);
        assert!((out[0] - 1.0).abs() < 1e-6, "quarter-cycle offset should start at peak");
    }

    #[test]
    fn sineloop_without_feedback_is_a_sine() {
        let mut plain = SineOsc::new();
        let mut looped = SineLoop::new();
        let mut a = vec![0.0; 64];
        let mut b = vec![0.0; 64];
        plain.render(&mut a, 440.0, 0.0, SAMPLE_RATE);
        looped.render(&mut b, 440.0, 0.0, SAMPLE_RATE);

        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn fm_with_zero_index_is_the_carrier() {
        let mut fm = FmOsc::new();
        let mut sine = SineOsc::new();
        let mut a = vec![0.0; 64];
        let mut b = vec![0.0; 64];
        fm.render(&mut a, 250.0, 0.5, 0.0, SAMPLE_RATE);
        sine.render(&mut b, 250.0, 0.0, SAMPLE_RATE);

        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn cross_fm_without_indices_is_a_sine() {
        let mut cross = CrossFmOsc::new();
        let mut sine = SineOsc::new();
        let mut a = vec![0.0; 64];
        let mut b = vec![0.0; 64];
        cross.render(&mut a, 300.0, 0.5, 0.0, 0.0, SAMPLE_RATE);
        sine.render(&mut b, 300.0, 0.0, SAMPLE_RATE);

        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn lfo_shapes_stay_bipolar() {
        for index in 0..8 {
            let mut lfo = Lfo::with_seed(LfoShape::from_index(index), 3);
            for sharp in [0.0, 0.5, 1.0] {
                let mut out = vec![0.0; 2048];
                lfo.render(&mut out, 7.0, sharp, 1_000.0);
                assert!(
                    out.iter().all(|s| (-1.0 - 1e-5..=1.0 + 1e-5).contains(s)),
                    "shape {index} left [-1, 1] at sharp {sharp}"
                );
            }
        }
        assert_eq!(LfoShape::from_index(42), LfoShape::ModSine);
    }

    #[test]
    fn sharp_saw_ramps_up() {
        let mut lfo = Lfo::new(LfoShape::SawUp);
        let mut out = vec![0.0; 100];
        lfo.render(&mut out, 10.0, 1.0, 1_000.0);
        assert!((out[0] + 1.0).abs() < 1e-6);
        assert!(out.windows(2).take(98).all(|w| w[1] > w[0]));
    }

    #[test]
    fn sample_hold_changes_once_per_cycle() {
        let mut lfo = Lfo::with_seed(LfoShape::SampleHold, 11);
        // 128 samples per cycle, exact in binary
        let mut out = vec![0.0; 384];
        lfo.render(&mut out, 8.0, 1.0, 1_024.0);
        assert!(out[1..128].iter().all(|&s| s == out[0]));
        assert!(out[129..256].iter().all(|&s| s == out[128]));
        assert_ne!(out[0], out[128]);
    }

    #[test]
    fn white_noise_stays_in_range() {
        for kind in [NoiseKind::Random, NoiseKind::Lcg] {
            let mut noise = WhiteNoise::with_seed(kind, 7);
            let mut out = vec![0.0; 4096];
            noise.render(&mut out);

            assert!(out.iter().all(|s| (-0.99..0.99).contains(s)));
            let mean = out.iter().sum::<f32>() / out.len() as f32;
            assert!(mean.abs() < 0.05, "noise should be centered, mean: {}", mean);
        }
    }

    #[test]
    fn colored_noise_is_bounded() {
        let mut pink = PinkNoise::new();
        let mut brown = BrownNoise::new();
        let mut out = vec![0.0; 4096];

        pink.render(&mut out);
        assert!(out.iter().all(|s| s.abs() < 1.5));
        brown.render(&mut out);
        assert!(out.iter().all(|s| s.abs() < 1.5));
    }
}
