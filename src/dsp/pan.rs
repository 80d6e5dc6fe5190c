//! Gain laws for spreading one signal over several outputs.
//!
//! Both panners use the square-root (equal power) law for two outputs:
//!
//!   left  = sqrt(1 - pan)
//!   right = sqrt(pan)
//!
//! With more outputs the speakers sit on a circle, output j at j / outs:
//!
//! - `pan_gain` weights every output by a raised cosine of its distance to the
//!   pan position. `spread` widens the lobe (0 = narrow, 1 = nearly omni):
//!
//!     gain_j = (0.5 + 0.5 · cos(2π · (pan - j/outs)))^(20 - 20·sqrt(spread) + 0.1)
//!
//! - `span_gain` only feeds the two outputs adjacent to the pan position,
//!   crossfading with the square-root law between them. The last output
//!   wraps around to the first.
//!
//! `voice_gain` places its outputs on a line instead, output j at position j,
//! and crossfades the two around `voice` the same way. It drives both the
//! output switcher and the input selector.

#[inline]
fn stereo(j: usize, pan: f32) -> f32 {
    match j {
        0 => (1.0 - pan).sqrt(),
        1 => pan.sqrt(),
        _ => 0.0,
    }
}

/// Gain of output `j` out of `outs` for the `Pan` law.
pub fn pan_gain(j: usize, outs: usize, pan: f32, spread: f32) -> f32 {
    let pan = pan.clamp(0.0, 1.0);
    match outs {
        0 => 0.0,
        1 => 1.0,
        2 => stereo(j, pan),
        _ => {
            let spread = spread.clamp(0.0, 1.0);
            let exponent = 20.0 - spread.sqrt() * 20.0 + 0.1;
            let phase = j as f32 / outs as f32;
            ((std::f32::consts::TAU * (pan - phase)).cos() * 0.5 + 0.5).powf(exponent)
        }
    }
}

/// Gain of output `j` out of `outs` for the `SPan` law.
pub fn span_gain(j: usize, outs: usize, pan: f32) -> f32 {
    match outs {
        0 => 0.0,
        1 => 1.0,
        2 => stereo(j, pan.clamp(0.0, 1.0)),
        _ => {
            let fouts = outs as f32;
            let left = (0..outs)
                .rev()
                .find(|&k| pan > k as f32 / fouts)
                .unwrap_or(0);
            let right = (left + 1) % outs;
            let local = ((pan - left as f32 / fouts) * fouts).clamp(0.0, 1.0);

            if j == left {
                (1.0 - local).sqrt()
            } else if j == right {
                local.sqrt()
            } else {
                0.0
            }
        }
    }
}

/// Gain of output `j` out of `count` with the crossfade at `voice`.
pub fn voice_gain(j: usize, count: usize, voice: f32) -> f32 {
    if count <= 1 {
        return if j == 0 { 1.0 } else { 0.0 };
    }
    let voice = voice.clamp(0.0, (count - 1) as f32);
    let mut left = voice as usize;
    if left >= count - 1 {
        left -= 1;
    }
    let frac = (voice - left as f32).clamp(0.0, 1.0);
    if j == left {
        (1.0 - frac).sqrt()
    } else if j == left + 1 {
        frac.sqrt()
    } else {
        0.0
    }
}
