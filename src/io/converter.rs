//! Pitch format conversions used by the MIDI objects.

/// Frequency of MIDI note 0 (C-1) in Hz.
pub const MIDI_ZERO_HZ: f32 = 8.175_798;
/// Equal-tempered semitone ratio, 2^(1/12).
pub const SEMITONE: f32 = 1.059_463_3;

/// MIDI note number to frequency in Hz.
pub fn midi_to_hz(note: f32) -> f32 {
    MIDI_ZERO_HZ * SEMITONE.powf(note)
}

/// Transposition ratio of `note` relative to `central_key`.
pub fn midi_to_transpo(note: f32, central_key: f32) -> f32 {
    SEMITONE.powf(note - central_key)
}

pub fn hz_to_midi(freq: f32) -> f32 {
    12.0 * (freq / MIDI_ZERO_HZ).log2()
}
