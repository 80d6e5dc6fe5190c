#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Channel voice messages understood by the MIDI objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Decode a raw status + data message. System messages are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let byte = |i: usize| data.get(i).map(|b| b & 0x7F);

        match status & 0xF0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: byte(0)?,
                velocity: byte(1)?,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: byte(0)?,
                velocity: byte(1)?,
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: byte(0)?,
                value: byte(1)?,
            }),
            0xC0 => Some(MidiEvent::ProgramChange {
                channel,
                program: byte(0)?,
            }),
            0xE0 => {
                let lsb = byte(0)? as i16;
                let msb = byte(1)? as i16;
                Some(MidiEvent::PitchBend {
                    channel,
                    value: ((msb << 7) | lsb) - 8192,
                })
            }
            _ => None,
        }
    }

    /// Note number and velocity for note messages.
    ///
    /// A note-on with velocity 0 is reported as a note-off.
    pub fn note(&self) -> Option<(u8, u8, bool)> {
        match *self {
            MidiEvent::NoteOn { key, velocity, .. } if velocity > 0 => Some((key, velocity, true)),
            MidiEvent::NoteOn { key, .. } => Some((key, 0, false)),
            MidiEvent::NoteOff { key, velocity, .. } => Some((key, velocity, false)),
            _ => None,
        }
    }
}

/// Source of MIDI events polled once per block on the audio thread.
pub trait MidiReceiver: Send {
    fn pop(&mut self) -> Option<MidiEvent>;
}

#[cfg(feature = "rtrb")]
impl MidiReceiver for Consumer<MidiEvent> {
    fn pop(&mut self) -> Option<MidiEvent> {
        Consumer::pop(self).ok()
    }
}
