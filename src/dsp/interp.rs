use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interpolation used when reading between stored points.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interp {
    /// Hold the previous point
    None,
    #[default]
    Linear,
    /// Raised-cosine blend between the two neighbours
    Cosine,
    /// Four-point cubic through the neighbours
    Cubic,
}

impl Interp {
    /// 1 none, 2 linear, 3 cosine, 4 cubic. Anything else is linear.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => Interp::None,
            3 => Interp::Cosine,
            4 => Interp::Cubic,
            _ => Interp::Linear,
        }
    }

    pub fn index(self) -> i64 {
        match self {
            Interp::None => 1,
            Interp::Linear => 2,
            Interp::Cosine => 3,
            Interp::Cubic => 4,
        }
    }

    /// Blend `y1 → y2` at `frac`, with `y0`/`y3` as outer neighbours.
    #[inline]
    pub fn blend(self, y0: f32, y1: f32, y2: f32, y3: f32, frac: f32) -> f32 {
        match self {
            Interp::None => y1,
            Interp::Linear => y1 + (y2 - y1) * frac,
            Interp::Cosine => {
                let mu = (1.0 - (frac * PI).cos()) * 0.5;
                y1 * (1.0 - mu) + y2 * mu
            }
            Interp::Cubic => {
                let f2 = frac * frac;
                let f3 = f2 * frac;
                let a0 = y3 - y2 - y0 + y1;
                let a1 = y0 - y1 - a0;
                let a2 = y2 - y0;
                a0 * f3 + a1 * f2 + a2 * frac + y1
            }
        }
    }

    /// Read `points` at fractional `pos`.
    ///
    /// With `wrap` the neighbours wrap around the ends (periodic tables),
    /// otherwise they clamp to the first and last point.
    pub fn read(self, points: &[f32], pos: f32, wrap: bool) -> f32 {
        let len = points.len();
        if len == 0 {
            return 0.0;
        }
        let base = pos.floor();
        let frac = pos - base;
        let i = base as i64;

        let at = |k: i64| -> f32 {
            let idx = if wrap {
                k.rem_euclid(len as i64)
            } else {
                k.clamp(0, len as i64 - 1)
            };
            points[idx as usize]
        };

        self.blend(at(i - 1), at(i), at(i + 1), at(i + 2), frac)
    }
}
