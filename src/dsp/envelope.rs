use crate::MIN_TIME;

/*
Velocity-Gated ADSR
===================

Linear attack/decay/sustain/release driven by a gate signal. The gate value
at note-on becomes the envelope's peak, so a MIDI velocity stream can drive
it directly:

  Level
   peak ┐     ╱╲
        │    ╱  ╲___________           sustain = peak · S
        │   ╱               ╲
    0.0 └──╱─────────────────╲──→ Time
        gate>0  A   D    S   gate=0  R

Per-sample increments come from the stage duration:

    increment = change / (time_seconds · sample_rate)

Stage transitions:

  Idle ──gate on──→ Attack ──level ≥ 1──→ Decay ──level ≤ S──→ Sustain
    ↑                  │                    │                    │
    │                  └────────gate off────┴────────────────────┘
    │                                       ↓
    └────────────level reaches 0──────── Release

Release starts from the CURRENT level, not the sustain level, so a note
released during its attack fades out without a jump. A new gate-on always
restarts the attack from zero.

`level` is normalized to [0, 1]; `output()` scales it by the peak.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate just went high, ramping up to 1.0
    Decay,   // Reached peak, ramping down to sustain level
    Sustain, // Holding at sustain level while gate is high
    Release, // Gate went low, ramping down to 0
}

pub struct Envelope {
    attack_time: f32,   // seconds to ramp 0 → 1
    decay_time: f32,    // seconds to ramp 1 → sustain
    sustain_level: f32, // fraction of peak held while the gate is high
    release_time: f32,  // seconds to ramp current → 0

    stage: EnvelopeState,
    level: f32,
    peak: f32,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),

            stage: EnvelopeState::Idle,
            level: 0.0,
            peak: 1.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_time = seconds.max(MIN_TIME);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay_time = seconds.max(MIN_TIME);
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release_time = seconds.max(MIN_TIME);
    }

    /// Gate high: restart the attack, peaking at `peak`.
    pub fn note_on(&mut self, peak: f32) {
        self.peak = peak;
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: release from the current level.
    pub fn note_off(&mut self, sample_rate: f32) {
        if self.stage == EnvelopeState::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance by one sample.
    pub fn next_sample(&mut self, sample_rate: f32) {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += 1.0 / (self.attack_time * sample_rate);

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.sustain_level;
                self.level -= (1.0 - target) / (self.decay_time * sample_rate);

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
    }

    /// Run the envelope from a gate signal: rising above zero triggers,
    /// returning to zero releases.
    pub fn render_gated(&mut self, gate: &[f32], out: &mut [f32], sample_rate: f32) {
        for (o, &g) in out.iter_mut().zip(gate) {
            let gate_high = g > 0.0;
            let active = matches!(
                self.stage,
                EnvelopeState::Attack | EnvelopeState::Decay | EnvelopeState::Sustain
            );
            if gate_high && (!active || g != self.peak) {
                self.note_on(g);
            } else if !gate_high && active {
                self.note_off(sample_rate);
            }

            self.next_sample(sample_rate);
            *o = self.output();
        }
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeState::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    /// Normalized level (0.0 to 1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Level scaled by the peak of the current note.
    pub fn output(&self) -> f32 {
        self.level * self.peak
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render_samples(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample(SAMPLE_RATE);
        }
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::adsr(0.01, 0.1, 0.7, 0.2);

        env.note_on(1.0);
        render_samples(&mut env, (0.01 * SAMPLE_RATE) as usize);

        assert!(env.level() > 0.99, "expected attack to reach full level");
        assert!(env.state() != EnvelopeState::Attack);
    }

    #[test]
    fn sustain_holds_fraction_of_peak() {
        let mut env = Envelope::adsr(0.01, 0.05, 0.6, 0.2);

        env.note_on(0.5);
        render_samples(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert!((env.output() - 0.3).abs() < 0.01, "sustain should be 0.6 of peak");
    }

    #[test]
    fn release_falls_back_to_idle() {
        let release = 0.03;
        let mut env = Envelope::adsr(0.01, 0.05, 0.5, release);

        env.note_on(1.0);
        render_samples(&mut env, (0.02 * SAMPLE_RATE) as usize);

        env.note_off(SAMPLE_RATE);
        render_samples(&mut env, (release * SAMPLE_RATE) as usize + 2);

        assert!(env.level() <= 0.001, "release should fall back to zero");
        assert_eq!(env.state(), EnvelopeState::Idle);
    }

    #[test]
    fn gate_signal_drives_envelope() {
        let mut env = Envelope::adsr(0.005, 0.005, 0.5, 0.005);
        let mut gate = vec![0.8; 50];
        gate.extend(vec![0.0; 50]);
        let mut out = vec![0.0; 100];

        env.render_gated(&gate, &mut out, SAMPLE_RATE);

        let peak = out.iter().fold(0.0f32, |acc, &x| acc.max(x));
        assert!((peak - 0.8).abs() < 0.01, "peak should follow gate value, got {}", peak);
        assert!((out[45] - 0.4).abs() < 0.01, "sustain at half of peak");
        assert_eq!(out[99], 0.0);
        assert!(!env.is_active());
    }
}
