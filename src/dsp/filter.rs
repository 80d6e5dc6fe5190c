use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | outside      |
| notch / band-stop | outside         | around cutoff|

Topology-preserving state variable filter (trapezoidal integrators). All four
responses come out of the same two integrators, so switching type does not
reset the filter state.

  g = tan(π · cutoff / sample_rate)
  k = 1 / q

Higher q narrows the band-pass and raises the resonant peak of low/high-pass.
*/

pub const MIN_Q: f32 = 0.5;
pub const MAX_Q: f32 = 500.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

impl FilterType {
    /// 0 lowpass, 1 highpass, 2 bandpass, 3 notch.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => FilterType::HighPass,
            2 => FilterType::BandPass,
            3 => FilterType::Notch,
            _ => FilterType::LowPass,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lowpass" | "lp" => Some(FilterType::LowPass),
            "highpass" | "hp" => Some(FilterType::HighPass),
            "bandpass" | "bp" => Some(FilterType::BandPass),
            "notch" | "bandstop" => Some(FilterType::Notch),
            _ => None,
        }
    }
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub q: f32,
    pub filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32, q: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            q: q.clamp(MIN_Q, MAX_Q),
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, MIN_Q)
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz, MIN_Q)
    }

    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        // Keep the cutoff below Nyquist, tan() explodes at π/2
        let cutoff = self.cutoff_hz.clamp(1.0, sample_rate * 0.49);
        (TAU * cutoff / (2.0 * sample_rate)).tan()
    }

    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32], sample_rate: f32) {
        let g = self.compute_g(sample_rate);
        let k = 1.0 / self.q;

        for (o, &x) in out.iter_mut().zip(input) {
            let outputs = self.next_sample(x, k, g);

            *o = match self.filter_type {
                FilterType::LowPass => outputs.lowpass,
                FilterType::HighPass => outputs.highpass,
                FilterType::BandPass => outputs.bandpass,
                FilterType::Notch => outputs.notch,
            }
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q.clamp(MIN_Q, MAX_Q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::SineOsc;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        let mut osc = SineOsc::new();
        let mut buffer = vec![0.0f32; len];
        osc.render(&mut buffer, freq, 0.0, SAMPLE_RATE);
        buffer
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(32);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn filtered(filter: &mut SVFilter, freq: f32, len: usize) -> f32 {
        let input = sine(freq, len);
        let mut out = vec![0.0f32; len];
        filter.reset();
        filter.render(&input, &mut out, SAMPLE_RATE);
        peak_after_transient(&out)
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = SVFilter::lowpass(500.0);
        let input = vec![1.0; 512];
        let mut out = vec![0.0; 512];
        filter.render(&input, &mut out, SAMPLE_RATE);

        assert!(out[511] > 0.99, "expected DC to pass, got {}", out[511]);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = SVFilter::highpass(500.0);
        let input = vec![1.0; 512];
        let mut out = vec![0.0; 512];
        filter.render(&input, &mut out, SAMPLE_RATE);

        assert!(out[511].abs() < 0.01, "expected DC to be rejected, got {}", out[511]);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let mut filter = SVFilter::lowpass(500.0);
        let peak = filtered(&mut filter, 5_000.0, 512);
        assert!(
            peak < 0.3,
            "Expected high freq attenuation, got peak: {}",
            peak
        );
    }

    #[test]
    fn test_bandpass_emphasizes_cutoff_frequency() {
        let mut filter = SVFilter::new(FilterType::BandPass, 1_000.0, 2.0);
        let pass_peak = filtered(&mut filter, 1_000.0, 1024);
        let off_peak = filtered(&mut filter, 200.0, 1024);

        assert!(
            pass_peak > off_peak * 2.0,
            "expected bandpass to emphasize cutoff freq, got pass_peak={}, off_peak={}",
            pass_peak,
            off_peak
        );
    }

    #[test]
    fn test_notch_rejects_cutoff_frequency() {
        let mut filter = SVFilter::new(FilterType::Notch, 1_000.0, 1.0);
        let center_peak = filtered(&mut filter, 1_000.0, 2048);
        let off_peak = filtered(&mut filter, 200.0, 2048);

        assert!(
            center_peak * 2.0 < off_peak,
            "expected notch to reject center freq, got center_peak={}, off_peak={}",
            center_peak,
            off_peak
        );
    }

    #[test]
    fn test_q_is_clamped() {
        let mut filter = SVFilter::lowpass(1000.0);
        filter.set_q(0.0);
        assert_eq!(filter.q, MIN_Q);
        filter.set_q(1e6);
        assert_eq!(filter.q, MAX_Q);
    }

    #[test]
    fn test_higher_q_raises_resonant_peak() {
        let mut filter = SVFilter::new(FilterType::LowPass, 1_000.0, 0.5);
        let peak_low_q = filtered(&mut filter, 1_000.0, 1024);

        filter.set_q(5.0);
        let peak_high_q = filtered(&mut filter, 1_000.0, 1024);

        assert!(
            peak_high_q > peak_low_q * 1.2,
            "High q should boost signal: high_q={}, low_q={}",
            peak_high_q,
            peak_low_q
        );
    }

    #[test]
    fn test_type_lookup() {
        assert_eq!(FilterType::from_index(2), FilterType::BandPass);
        assert_eq!(FilterType::from_name("HP"), Some(FilterType::HighPass));
        assert_eq!(FilterType::from_name("comb"), None);
    }
}
