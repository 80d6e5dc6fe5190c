//! MIDI-driven control objects.
//!
//! MIDI arrives through a [`MidiReceiver`] polled by a hidden reader unit,
//! created before the object's own units so they see this block's events.
//! The reader publishes what it decoded through shared cells; the visible
//! units only read them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{impl_proxy, input_streams, setters, shared::SharedValue, unit, OutputKind, ProxyCore, Source, Streams};
use crate::{
    broadcast::{Arg, Value},
    dsp::envelope::Envelope,
    engine::{Handle, Inputs, ProcessCtx, Processor},
    io::{
        converter::{midi_to_hz, midi_to_transpo},
        midi::{MidiEvent, MidiReceiver},
    },
    EngineContext, Error, Result,
};

/// Output format of [`Notein`] pitch streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteScale {
    /// MIDI note number
    #[default]
    Midi,
    /// Frequency in Hz
    Hertz,
    /// Transposition ratio around the middle of the key range
    Transpo,
}

impl NoteScale {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(NoteScale::Midi),
            1 => Some(NoteScale::Hertz),
            2 => Some(NoteScale::Transpo),
            _ => None,
        }
    }
}

/// Whether a message on `channel` (0-based) passes a filter where 0 means
/// every channel and 1..=16 one of them.
fn channel_matches(filter: u8, channel: u8) -> bool {
    filter == 0 || filter == channel + 1
}

fn event_channel(event: &MidiEvent) -> u8 {
    match *event {
        MidiEvent::NoteOn { channel, .. }
        | MidiEvent::NoteOff { channel, .. }
        | MidiEvent::ControlChange { channel, .. }
        | MidiEvent::PitchBend { channel, .. }
        | MidiEvent::ProgramChange { channel, .. } => channel,
    }
}

// ---------------------------------------------------------------------------

const IDLE: f32 = -1.0;

#[derive(Clone)]
struct Voice {
    pitch: SharedValue,
    velocity: SharedValue,
    /// Held key, -1 when the voice is free
    key: SharedValue,
}

impl Voice {
    fn new() -> Self {
        Self {
            pitch: SharedValue::new(0.0),
            velocity: SharedValue::new(0.0),
            key: SharedValue::new(IDLE),
        }
    }
}

struct NoteAllocator<R> {
    rx: R,
    voices: Vec<Voice>,
    next: usize,
    scale: NoteScale,
    first: u8,
    last: u8,
    channel: u8,
}

impl<R: MidiReceiver> NoteAllocator<R> {
    fn scaled(&self, key: u8) -> f32 {
        let key = key as f32;
        match self.scale {
            NoteScale::Midi => key,
            NoteScale::Hertz => midi_to_hz(key),
            NoteScale::Transpo => {
                let central = (self.first as f32 + self.last as f32) / 2.0;
                midi_to_transpo(key, central)
            }
        }
    }

    fn held_by(&self, key: u8) -> Option<usize> {
        self.voices.iter().position(|v| v.key.get() == key as f32)
    }

    fn note_on(&mut self, key: u8, velocity: u8) {
        // a repeated key retriggers its voice, anything else steals round-robin
        let index = match self.held_by(key) {
            Some(index) => index,
            None => {
                let index = self.next;
                self.next = (self.next + 1) % self.voices.len();
                index
            }
        };
        let voice = &self.voices[index];
        voice.key.set(key as f32);
        voice.pitch.set(self.scaled(key));
        voice.velocity.set(velocity as f32 / 127.0);
    }

    fn note_off(&mut self, key: u8) {
        if let Some(index) = self.held_by(key) {
            let voice = &self.voices[index];
            voice.key.set(IDLE);
            voice.velocity.set(0.0);
        }
    }
}

impl<R: MidiReceiver> Processor for NoteAllocator<R> {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        while let Some(event) = self.rx.pop() {
            if !channel_matches(self.channel, event_channel(&event)) {
                continue;
            }
            let Some((key, velocity, on)) = event.note() else {
                continue;
            };
            if key < self.first || key > self.last {
                continue;
            }
            if on {
                self.note_on(key, velocity);
            } else {
                self.note_off(key);
            }
        }
        let active = self.voices.iter().filter(|v| v.key.get() >= 0.0).count();
        out.fill(active as f32);
    }
}

/// Streams one shared cell.
struct VoiceUnit {
    value: SharedValue,
}

impl Processor for VoiceUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        out.fill(self.value.get());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteinParams {
    /// Number of voices, fixed at creation
    pub poly: usize,
    pub scale: NoteScale,
    /// Lowest key accepted
    pub first: u8,
    /// Highest key accepted
    pub last: u8,
    /// MIDI channel, 0 for all
    pub channel: u8,
    /// Applied to the velocity streams only
    pub mul: Arg,
    pub add: Arg,
}

impl Default for NoteinParams {
    fn default() -> Self {
        Self {
            poly: 10,
            scale: NoteScale::Midi,
            first: 0,
            last: 127,
            channel: 0,
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Polyphonic note input.
///
/// Each voice is a pitch/velocity pair. Velocity drops to 0 on note-off while
/// pitch keeps the last note, so a release tail stays in tune.
pub struct Notein {
    core: ProxyCore,
    reader: Handle,
    voices: Vec<Voice>,
}

impl Notein {
    pub fn new(ctx: &EngineContext, rx: impl MidiReceiver + 'static, params: NoteinParams) -> Result<Self> {
        if params.poly == 0 {
            return Err(Error::EmptyBroadcastInput {
                param: "poly".into(),
            });
        }
        let voices: Vec<Voice> = (0..params.poly).map(|_| Voice::new()).collect();
        let allocator = NoteAllocator {
            rx,
            voices: voices.clone(),
            next: 0,
            scale: params.scale,
            first: params.first.min(params.last),
            last: params.last.max(params.first),
            channel: params.channel,
        };
        let reader = ctx.add_unit(Box::new(allocator), &[])?;

        let mut core = ProxyCore::new(
            ctx,
            OutputKind::ControlOnly,
            vec![("mul", params.mul), ("add", params.add)],
        )
        .post_on_member(1);
        // voice count is fixed; longer mul/add lists wrap over it
        for voice in &voices {
            core.push_channel(vec![
                unit(VoiceUnit { value: voice.pitch.clone() }, vec![]),
                unit(VoiceUnit { value: voice.velocity.clone() }, vec![]),
            ])?;
        }
        debug!(poly = voices.len(), scale = ?params.scale, "notein created");
        Ok(Self { core, reader, voices })
    }

    pub fn pitch(&self) -> Streams {
        self.core.member_streams(0)
    }

    pub fn velocity(&self) -> Streams {
        self.core.member_streams(1)
    }

    pub fn poly(&self) -> usize {
        self.voices.len()
    }

    /// Key held by `voice`, -1 when it is free.
    pub fn get_value(&self, voice: usize) -> Result<i32> {
        let voice = self.voices.get(voice).ok_or(Error::IndexOutOfRange {
            index: voice,
            len: self.voices.len(),
        })?;
        Ok(voice.key.get() as i32)
    }

    /// Voices currently holding a note, as of the last block.
    pub fn active_voices(&self) -> Result<usize> {
        Ok(self.reader.value()? as usize)
    }

    setters! {
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Notein);

// ---------------------------------------------------------------------------

const CONTROLLERS: usize = 128;
/// Row 0 holds the last value from any channel, rows 1..=16 per channel.
const CC_ROWS: usize = 17;

/// Last raw value of every controller, NaN until one arrives.
#[derive(Clone)]
struct CcTable(Arc<[AtomicU32]>);

impl CcTable {
    fn new() -> Self {
        let cells: Vec<AtomicU32> = (0..CONTROLLERS * CC_ROWS)
            .map(|_| AtomicU32::new(f32::NAN.to_bits()))
            .collect();
        Self(cells.into())
    }

    fn get(&self, channel: usize, controller: usize) -> f32 {
        let index = channel.min(CC_ROWS - 1) * CONTROLLERS + controller.min(CONTROLLERS - 1);
        f32::from_bits(self.0[index].load(Ordering::Relaxed))
    }

    fn set(&self, channel: usize, controller: usize, value: f32) {
        let index = channel * CONTROLLERS + controller;
        self.0[index].store(value.to_bits(), Ordering::Relaxed);
    }
}

struct CcReader<R> {
    rx: R,
    table: CcTable,
}

impl<R: MidiReceiver> Processor for CcReader<R> {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        while let Some(event) = self.rx.pop() {
            if let MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } = event
            {
                let (channel, controller) = (channel as usize & 0x0F, controller as usize & 0x7F);
                self.table.set(0, controller, value as f32);
                self.table.set(channel + 1, controller, value as f32);
            }
        }
        out.fill(0.0);
    }
}

struct MidictlUnit {
    table: CcTable,
    controller: usize,
    channel: usize,
    min: f32,
    max: f32,
    current: f32,
}

fn controller_number(name: &str, value: &Value) -> Result<usize> {
    match value.expect_int(name)? {
        n @ 0..=127 => Ok(n as usize),
        _ => Err(Error::TypeMismatch {
            param: name.into(),
            expected: "a controller number in 0..=127",
        }),
    }
}

fn channel_number(name: &str, value: &Value) -> Result<usize> {
    match value.expect_int(name)? {
        n @ 0..=16 => Ok(n as usize),
        _ => Err(Error::TypeMismatch {
            param: name.into(),
            expected: "a MIDI channel in 0..=16",
        }),
    }
}

impl Processor for MidictlUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let raw = self.table.get(self.channel, self.controller);
        let target = if raw.is_nan() {
            self.min
        } else {
            raw / 127.0 * (self.max - self.min) + self.min
        };

        // linear ramp to the new value over the block
        let step = (target - self.current) / out.len().max(1) as f32;
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.current + step * (i + 1) as f32;
        }
        self.current = target;
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "ctlnumber" => self.controller = controller_number(name, value)?,
            "channel" => self.channel = channel_number(name, value)?,
            "minscale" => self.min = value.expect_f32(name)?,
            "maxscale" => self.max = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidictlParams {
    /// Controller number, 0..=127
    pub ctlnumber: Arg,
    /// Output when the controller is at 0
    pub minscale: Arg,
    /// Output when the controller is at 127
    pub maxscale: Arg,
    /// MIDI channel, 0 for all
    pub channel: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for MidictlParams {
    fn default() -> Self {
        Self {
            ctlnumber: Arg::from(0),
            minscale: Arg::from(0.0),
            maxscale: Arg::from(1.0),
            channel: Arg::from(0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Continuous controller input, scaled into `[minscale, maxscale]`.
///
/// Outputs `minscale` until the first message for its controller arrives.
pub struct Midictl {
    core: ProxyCore,
    _reader: Handle,
}

impl Midictl {
    pub fn new(ctx: &EngineContext, rx: impl MidiReceiver + 'static, params: MidictlParams) -> Result<Self> {
        let table = CcTable::new();
        let reader = ctx.add_unit(
            Box::new(CcReader {
                rx,
                table: table.clone(),
            }),
            &[],
        )?;

        let mut core = ProxyCore::new(
            ctx,
            OutputKind::ControlOnly,
            vec![
                ("ctlnumber", params.ctlnumber),
                ("minscale", params.minscale),
                ("maxscale", params.maxscale),
                ("channel", params.channel),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let min = args.f32("minscale", ch)?;
            let processor = MidictlUnit {
                table: table.clone(),
                controller: controller_number("ctlnumber", args.value("ctlnumber", ch)?)?,
                channel: channel_number("channel", args.value("channel", ch)?)?,
                min,
                max: args.f32("maxscale", ch)?,
                current: min,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self {
            core,
            _reader: reader,
        })
    }

    setters! {
        set_ctlnumber => "ctlnumber",
        set_minscale => "minscale",
        set_maxscale => "maxscale",
        set_channel => "channel",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Midictl);

// ---------------------------------------------------------------------------

struct AdsrUnit {
    envelope: Envelope,
}

impl Processor for AdsrUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.envelope.render_gated(inputs.get(0), out, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let seconds = value.expect_f32(name)?;
        match name {
            "attack" => self.envelope.set_attack(seconds),
            "decay" => self.envelope.set_decay(seconds),
            "sustain" => self.envelope.set_sustain(seconds),
            "release" => self.envelope.set_release(seconds),
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    fn on_play(&mut self) {
        self.envelope.reset();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidiAdsrParams {
    pub attack: Arg,
    pub decay: Arg,
    /// Fraction of the note velocity held until release
    pub sustain: Arg,
    pub release: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for MidiAdsrParams {
    fn default() -> Self {
        Self {
            attack: Arg::from(0.01),
            decay: Arg::from(0.05),
            sustain: Arg::from(0.7),
            release: Arg::from(0.1),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// ADSR envelope gated by a velocity stream; the velocity sets the peak.
pub struct MidiAdsr {
    core: ProxyCore,
}

impl MidiAdsr {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: MidiAdsrParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("attack", params.attack),
                ("decay", params.decay),
                ("sustain", params.sustain),
                ("release", params.release),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let envelope = Envelope::adsr(
                args.f32("attack", ch)?,
                args.f32("decay", ch)?,
                args.f32("sustain", ch)?,
                args.f32("release", ch)?,
            );
            let inputs = streams.wrap(ch).into_iter().collect();
            core.push_channel(vec![unit(AdsrUnit { envelope }, inputs)])?;
        }
        Ok(Self { core })
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_attack => "attack",
        set_decay => "decay",
        set_sustain => "sustain",
        set_release => "release",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(MidiAdsr);
