//! Waveshaping and range folding
//!
//! Every function here maps one input sample to one output sample (Degrade
//! also holds a sample between updates). They are the kernels behind the
//! `Clip`, `Mirror`, `Wrap`, `Disto` and `Degrade` objects.
//!
//! # Range Functions
//!
//! Given a range `[min, max]`:
//!
//!   Clip:    values outside are clamped to the nearest bound
//!   Mirror:  values outside are reflected back inside
//!            (max + 0.2 → max - 0.2)
//!   Wrap:    values outside re-enter from the opposite bound
//!            (max + 0.2 → min + 0.2)
//!
//! When `min >= max` the range is degenerate. Mirror and Wrap then output
//! the midpoint `(min + max) / 2`; Clip clamps to `max`.
//!
//! # Arctangent Distortion
//!
//!   y = atan2(x, d),  d = 0.4 - drive * 0.3999
//!
//! drive = 0 gives a gentle curve, drive = 1 a near-square wave. A one-pole
//! lowpass (`slope`) then tames the added harmonics.
//!
//! # Bit and Rate Reduction
//!
//!   scale   = 2^(bitdepth - 1)
//!   y       = trunc(x * scale + 0.5) / scale
//!   hold    = trunc(1 / srscale) samples between updates

/// Clamp to `[min, max]`.
#[inline]
pub fn clip(sample: f32, min: f32, max: f32) -> f32 {
    if sample < min {
        min
    } else if sample > max {
        max
    } else {
        sample
    }
}

/// Reflect back into `[min, max]`.
#[inline]
pub fn mirror(sample: f32, min: f32, max: f32) -> f32 {
    if min >= max {
        return (min + max) * 0.5;
    }
    let mut x = sample;
    while x > max || x < min {
        if x > max {
            x = max + max - x;
        } else {
            x = min + min - x;
        }
    }
    x
}

/// Wrap around into `[min, max)`.
#[inline]
pub fn wrap(sample: f32, min: f32, max: f32) -> f32 {
    if min >= max {
        return (min + max) * 0.5;
    }
    let range = max - min;
    let mut t = (sample - min) / range;
    if t >= 1.0 {
        t -= t.trunc();
    } else if t < 0.0 {
        t += (-t).trunc() + 1.0;
    } else {
        return sample;
    }
    t * range + min
}

/// Arctangent waveshaper followed by a one-pole lowpass.
pub struct Disto {
    last: f32,
}

impl Disto {
    pub fn new() -> Self {
        Self { last: 0.0 }
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32], drive: f32, slope: f32) {
        let d = 0.4 - drive.clamp(0.0, 1.0) * 0.3999;
        let slope = slope.clamp(0.0, 1.0);
        let coeff = 1.0 - slope;

        for (o, &x) in out.iter_mut().zip(input) {
            let shaped = x.atan2(d);
            self.last = shaped * coeff + self.last * slope;
            *o = self.last;
        }
    }
}

impl Default for Disto {
    fn default() -> Self {
        Self::new()
    }
}

pub const MIN_BITDEPTH: f32 = 1.0;
pub const MAX_BITDEPTH: f32 = 32.0;
pub const MIN_SRSCALE: f32 = 0.000_976_562_5;
pub const MAX_SRSCALE: f32 = 1.0;

/// Bit depth and sample rate reducer.
pub struct Degrade {
    held: f32,
    count: usize,
}

impl Degrade {
    pub fn new() -> Self {
        Self { held: 0.0, count: 0 }
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32], bitdepth: f32, srscale: f32) {
        let bitdepth = bitdepth.clamp(MIN_BITDEPTH, MAX_BITDEPTH);
        let srscale = srscale.clamp(MIN_SRSCALE, MAX_SRSCALE);

        let scale = 2.0_f32.powf(bitdepth - 1.0);
        let hold = (1.0 / srscale) as usize;

        for (o, &x) in out.iter_mut().zip(input) {
            self.count += 1;
            if self.count >= hold {
                self.count = 0;
                self.held = (x * scale + 0.5).trunc() / scale;
            }
            *o = self.held;
        }
    }
}

impl Default for Degrade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_bounds() {
        assert_eq!(clip(1.5, -1.0, 1.0), 1.0);
        assert_eq!(clip(-1.5, -1.0, 1.0), -1.0);
        assert_eq!(clip(0.3, -1.0, 1.0), 0.3);
    }

    #[test]
    fn test_mirror_reflects() {
        assert!((mirror(1.2, -1.0, 1.0) - 0.8).abs() < 1e-6);
        assert!((mirror(-1.25, -1.0, 1.0) - (-0.75)).abs() < 1e-6);
        // 3.5 → -1.5 → -0.5
        assert!((mirror(3.5, -1.0, 1.0) - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_reenters_from_other_side() {
        assert!((wrap(1.2, 0.0, 1.0) - 0.2).abs() < 1e-6);
        assert!((wrap(-0.25, 0.0, 1.0) - 0.75).abs() < 1e-6);
        assert!((wrap(0.5, 0.0, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_range_outputs_midpoint() {
        assert_eq!(mirror(0.9, 0.5, 0.5), 0.5);
        assert_eq!(wrap(0.9, 1.0, 0.0), 0.5);
    }

    #[test]
    fn test_disto_saturates() {
        let mut disto = Disto::new();
        let input = [1.0; 64];
        let mut out = [0.0; 64];
        disto.render(&input, &mut out, 1.0, 0.0);

        // atan2(1, 0.0001) ≈ π/2
        assert!((out[63] - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn test_degrade_quantizes() {
        let mut degrade = Degrade::new();
        let input = [0.3; 4];
        let mut out = [0.0; 4];
        degrade.render(&input, &mut out, 2.0, 1.0);

        // scale = 2, trunc(0.3 * 2 + 0.5) / 2 = 0.5
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_degrade_holds_samples() {
        let mut degrade = Degrade::new();
        let input = [0.0, 0.25, 0.5, 0.75, 1.0, 0.0];
        let mut out = [0.0; 6];
        degrade.render(&input, &mut out, 32.0, 0.5);

        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.25);
        assert_eq!(out[2], 0.25);
        assert_eq!(out[3], 0.75);
    }
}
