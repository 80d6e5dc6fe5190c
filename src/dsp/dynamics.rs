//! Envelope followers driving a compressor and a noise gate.
//!
//! Both kernels delay the signal they shape by a short lookahead so the gain
//! can react before a transient reaches the output.
//!
//! # Compressor
//!
//! A peak follower with separate attack and release coefficients
//!
//!   coef   = exp(-1 / (sr · time))
//!   follow = |x| + coef · (follow - |x|)
//!
//! is compared to the threshold. Above it the level in dB is reduced by
//! `diff - diff / ratio`. With a soft knee the threshold moves up by
//! `3 · knee` dB and the ratio fades in over the `knee · 8.5 + 0.5` dB below.
//!
//! # Gate
//!
//! A mean-square follower smoothed at a fixed 20 Hz is compared to
//! `10^(thresh / 20)`. Above it the gate opens towards 1 with the rise time,
//! below it closes towards 0 with the fall time.

/// Longest lookahead, in milliseconds.
pub const MAX_LOOKAHEAD_MS: f32 = 25.0;

const MIN_COMPRESS_RAMP: f32 = 0.001;
const MIN_GATE_RAMP: f32 = 0.0001;

#[inline]
fn ramp_coef(time: f32, min: f32, sample_rate: f32) -> f32 {
    let time = if time <= 0.0 { min } else { time };
    (-1.0 / (sample_rate * time)).exp()
}

#[inline]
fn db_to_amp(db: f32) -> f32 {
    10f32.powf(db * 0.05)
}

/// Gain clamp: never zero, never above unity.
#[inline]
fn clip_gain(x: f32) -> f32 {
    if x <= 0.0 {
        1e-8
    } else {
        x.min(1.0)
    }
}

/// Circular buffer delaying the input by up to [`MAX_LOOKAHEAD_MS`].
#[derive(Debug, Clone)]
struct Lookahead {
    buffer: Vec<f32>,
    pos: usize,
}

impl Lookahead {
    fn new(sample_rate: f32) -> Self {
        let size = (MAX_LOOKAHEAD_MS * 0.001 * sample_rate).round() as usize + 1;
        Self {
            buffer: vec![0.0; size],
            pos: 0,
        }
    }

    fn samples(&self, ms: f32, sample_rate: f32) -> usize {
        let ms = ms.clamp(0.0, MAX_LOOKAHEAD_MS);
        ((ms * 0.001 * sample_rate) as usize).min(self.buffer.len() - 1)
    }

    #[inline]
    fn push(&mut self, x: f32, delay: usize) -> f32 {
        let len = self.buffer.len();
        self.buffer[self.pos] = x;
        let y = self.buffer[(self.pos + len - delay) % len];
        self.pos = (self.pos + 1) % len;
        y
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// Threshold in dBFS
    pub thresh: f32,
    /// Input/output ratio above the threshold
    pub ratio: f32,
    /// Attack time in seconds
    pub risetime: f32,
    /// Release time in seconds
    pub falltime: f32,
    /// Delay of the compressed signal in milliseconds, 0..25
    pub lookahead: f32,
    /// 0 hard knee, 1 softest knee
    pub knee: f32,
    /// Output the gain instead of the compressed signal
    pub output_amp: bool,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            thresh: -20.0,
            ratio: 2.0,
            risetime: 0.01,
            falltime: 0.1,
            lookahead: 5.0,
            knee: 0.0,
            output_amp: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compressor {
    follow: f32,
    delay: Lookahead,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follow: 0.0,
            delay: Lookahead::new(sample_rate),
        }
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32], s: &CompressorSettings, sample_rate: f32) {
        let rise = ramp_coef(s.risetime, MIN_COMPRESS_RAMP, sample_rate);
        let fall = ramp_coef(s.falltime, MIN_COMPRESS_RAMP, sample_rate);
        let ratio = 1.0 / s.ratio.max(1e-3);
        let knee_amount = s.knee.clamp(0.0, 1.0);
        let knee = knee_amount * 0.999 + 0.001;
        let thresh = (s.thresh + 3.0 * knee_amount).min(0.0);
        let amp_thresh = db_to_amp(thresh);
        let knee_thresh = db_to_amp(thresh - (knee_amount * 8.5 + 0.5));
        let inv_knee_range = 1.0 / (amp_thresh - knee_thresh);
        let delay = self.delay.samples(s.lookahead, sample_rate);

        for (o, &x) in out.iter_mut().zip(input) {
            let level = x.abs();
            let coef = if self.follow < level { rise } else { fall };
            self.follow = level + coef * (self.follow - level);
            let delayed = self.delay.push(x, delay);

            let gain = if self.follow > amp_thresh {
                let diff = 20.0 * clip_gain(self.follow).log10() - thresh;
                db_to_amp(-(diff - diff * ratio))
            } else if self.follow > knee_thresh {
                let scale = (self.follow - knee_thresh) * inv_knee_range;
                let knee_ratio = ((knee + 1.0) * scale / (knee + scale)) * (ratio - 1.0) + 1.0;
                let diff = 20.0 * clip_gain(self.follow).log10() - thresh;
                db_to_amp(-(diff - diff * knee_ratio))
            } else {
                1.0
            };

            *o = if s.output_amp {
                clip_gain(gain)
            } else {
                delayed * clip_gain(gain)
            };
        }
    }

    pub fn reset(&mut self) {
        self.follow = 0.0;
        self.delay.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSettings {
    /// Threshold in dBFS
    pub thresh: f32,
    /// Opening time in seconds
    pub risetime: f32,
    /// Closing time in seconds
    pub falltime: f32,
    /// Delay of the gated signal in milliseconds, 0..25
    pub lookahead: f32,
    /// Output the gate envelope instead of the gated signal
    pub output_amp: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            thresh: -70.0,
            risetime: 0.01,
            falltime: 0.05,
            lookahead: 5.0,
            output_amp: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gate {
    power: f32,
    gate: f32,
    smoothing: f32,
    delay: Lookahead,
}

impl Gate {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            power: 0.0,
            gate: 0.0,
            smoothing: (-20.0 / sample_rate).exp(),
            delay: Lookahead::new(sample_rate),
        }
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32], s: &GateSettings, sample_rate: f32) {
        let rise = ramp_coef(s.risetime, MIN_GATE_RAMP, sample_rate);
        let fall = ramp_coef(s.falltime, MIN_GATE_RAMP, sample_rate);
        let amp_thresh = db_to_amp(s.thresh);
        let delay = self.delay.samples(s.lookahead, sample_rate);

        for (o, &x) in out.iter_mut().zip(input) {
            let square = x * x;
            self.power = square + self.smoothing * (self.power - square);
            self.gate = if self.power >= amp_thresh {
                1.0 + rise * (self.gate - 1.0)
            } else {
                fall * self.gate
            };
            let delayed = self.delay.push(x, delay);
            *o = if s.output_amp { self.gate } else { delayed * self.gate };
        }
    }

    pub fn gain(&self) -> f32 {
        self.gate
    }

    pub fn reset(&mut self) {
        self.power = 0.0;
        self.gate = 0.0;
        self.delay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn quiet_signal_passes_uncompressed() {
        let mut comp = Compressor::new(SAMPLE_RATE);
        let settings = CompressorSettings {
            lookahead: 0.0,
            ..Default::default()
        };
        let input = vec![0.01; 256];
        let mut out = vec![0.0; 256];
        comp.render(&input, &mut out, &settings, SAMPLE_RATE);
        assert!(out.iter().all(|&y| (y - 0.01).abs() < 1e-6));
    }

    #[test]
    fn loud_signal_settles_on_the_ratio() {
        // -6 dBFS into a -20 dB threshold at 2:1 leaves 7 dB of reduction
        let mut comp = Compressor::new(SAMPLE_RATE);
        let settings = CompressorSettings {
            risetime: 0.001,
            output_amp: true,
            ..Default::default()
        };
        let level = db_to_amp(-6.0);
        let input = vec![level; 4800];
        let mut out = vec![0.0; 4800];
        comp.render(&input, &mut out, &settings, SAMPLE_RATE);
        let gain_db = 20.0 * out[4799].log10();
        assert!((gain_db + 7.0).abs() < 0.05, "gain {gain_db} dB");
    }

    #[test]
    fn lookahead_delays_the_signal() {
        let mut comp = Compressor::new(1_000.0);
        let settings = CompressorSettings {
            lookahead: 5.0,
            thresh: 0.0,
            ..Default::default()
        };
        let mut input = vec![0.0; 10];
        input[0] = 0.5;
        let mut out = vec![0.0; 10];
        comp.render(&input, &mut out, &settings, 1_000.0);
        assert_eq!(out[0], 0.0);
        assert!((out[5] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gate_opens_above_threshold_and_closes_below() {
        let mut gate = Gate::new(SAMPLE_RATE);
        let settings = GateSettings {
            thresh: -30.0,
            lookahead: 0.0,
            ..Default::default()
        };
        let mut out = vec![0.0; 4800];
        gate.render(&vec![0.5; 4800], &mut out, &settings, SAMPLE_RATE);
        assert!(gate.gain() > 0.99);

        gate.render(&vec![0.0; 48_000], &mut vec![0.0; 48_000], &settings, SAMPLE_RATE);
        assert!(gate.gain() < 1e-3);
    }
}
