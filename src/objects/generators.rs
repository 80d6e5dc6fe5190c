//! Oscillators, noise sources and the table reader.

use super::shared::Mailbox;
use super::{impl_proxy, setters, unit, OutputKind, ProxyCore};
use crate::{
    broadcast::{Arg, Value},
    dsp::{
        oscillator::{
            self, CrossFmOsc, FmOsc, Lfo as LfoKernel, LfoShape, NoiseKind, Phase, Phasor as PhasorKernel,
            SineOsc, WhiteNoise,
        },
        Interp,
    },
    engine::{Inputs, ProcessCtx, Processor},
    tables::{SharedTable, Table},
    EngineContext, Error, Result,
};

fn unknown<T>(name: &str) -> Result<T> {
    Err(Error::UnknownParam(name.to_string()))
}

// ---------------------------------------------------------------------------
// Sine

struct SineUnit {
    osc: SineOsc,
    freq: f32,
    phase: f32,
}

impl Processor for SineUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.osc.render(out, self.freq, self.phase, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "freq" => self.freq = value.expect_f32(name)?,
            "phase" => self.phase = value.expect_f32(name)?,
            _ => return unknown(name),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SineParams {
    /// Hz, default 1000
    pub freq: Arg,
    /// Phase offset in cycles, default 0
    pub phase: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SineParams {
    fn default() -> Self {
        Self {
            freq: Arg::from(1000.0),
            phase: Arg::from(0.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Sine wave oscillator.
pub struct Sine {
    core: ProxyCore,
}

impl Sine {
    pub fn new(ctx: &EngineContext, params: SineParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("freq", params.freq),
                ("phase", params.phase),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let processor = SineUnit {
                osc: SineOsc::new(),
                freq: args.f32("freq", ch)?,
                phase: args.f32("phase", ch)?,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_freq => "freq",
        set_phase => "phase",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Sine);

// ---------------------------------------------------------------------------
// SineLoop

struct SineLoopUnit {
    osc: oscillator::SineLoop,
    freq: f32,
    feedback: f32,
}

impl Processor for SineLoopUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.osc.render(out, self.freq, self.feedback, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "freq" => self.freq = value.expect_f32(name)?,
            "feedback" => self.feedback = value.expect_f32(name)?,
            _ => return unknown(name),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SineLoopParams {
    pub freq: Arg,
    /// Amount of output fed back into the phase, clamped to 0..1
    pub feedback: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SineLoopParams {
    fn default() -> Self {
        Self {
            freq: Arg::from(1000.0),
            feedback: Arg::from(0.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Sine oscillator with self-modulating feedback.
pub struct SineLoop {
    core: ProxyCore,
}

impl SineLoop {
    pub fn new(ctx: &EngineContext, params: SineLoopParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("freq", params.freq),
                ("feedback", params.feedback),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let processor = SineLoopUnit {
                osc: oscillator::SineLoop::new(),
                freq: args.f32("freq", ch)?,
                feedback: args.f32("feedback", ch)?,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_freq => "freq",
        set_feedback => "feedback",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(SineLoop);

// ---------------------------------------------------------------------------
// Phasor

struct PhasorUnit {
    phasor: PhasorKernel,
    freq: f32,
    phase: f32,
}

impl Processor for PhasorUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.phasor.render(out, self.freq, self.phase, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "freq" => self.freq = value.expect_f32(name)?,
            "phase" => self.phase = value.expect_f32(name)?,
            _ => return unknown(name),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhasorParams {
    pub freq: Arg,
    pub phase: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for PhasorParams {
    fn default() -> Self {
        Self {
            freq: Arg::from(100.0),
            phase: Arg::from(0.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Rising ramp from 0 to 1.
pub struct Phasor {
    core: ProxyCore,
}

impl Phasor {
    pub fn new(ctx: &EngineContext, params: PhasorParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("freq", params.freq),
                ("phase", params.phase),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let processor = PhasorUnit {
                phasor: PhasorKernel::new(),
                freq: args.f32("freq", ch)?,
                phase: args.f32("phase", ch)?,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_freq => "freq",
        set_phase => "phase",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Phasor);

// ---------------------------------------------------------------------------
// Noise

struct NoiseUnit(WhiteNoise);

impl Processor for NoiseUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        self.0.render(out);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "type" => self.0.kind = NoiseKind::from_index(value.expect_int(name)?),
            _ => return unknown(name),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseParams {
    /// 0 general purpose generator, 1 cheaper LCG
    pub kind: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            kind: Arg::from(0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// White noise generator.
pub struct Noise {
    core: ProxyCore,
}

impl Noise {
    pub fn new(ctx: &EngineContext, params: NoiseParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![("type", params.kind), ("mul", params.mul), ("add", params.add)],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let kind = NoiseKind::from_index(args.int("type", ch)?);
            core.push_channel(vec![unit(NoiseUnit(WhiteNoise::new(kind)), vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_type => "type",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Noise);

struct PinkUnit(oscillator::PinkNoise);

impl Processor for PinkUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        self.0.render(out);
    }
}

struct BrownUnit(oscillator::BrownNoise);

impl Processor for BrownUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        self.0.render(out);
    }
}

fn post_only(
    ctx: &EngineContext,
    mul: Arg,
    add: Arg,
    mut make: impl FnMut() -> Box<dyn Processor>,
) -> Result<ProxyCore> {
    let mut core = ProxyCore::new(ctx, OutputKind::Audio, vec![("mul", mul), ("add", add)]);
    let channels = core.broadcast(None)?.len();
    for _ in 0..channels {
        core.push_channel(vec![(make(), Vec::new())])?;
    }
    Ok(core)
}

/// Pink noise (-3 dB per octave).
pub struct PinkNoise {
    core: ProxyCore,
}

impl PinkNoise {
    pub fn new(ctx: &EngineContext, mul: impl Into<Arg>, add: impl Into<Arg>) -> Result<Self> {
        let core = post_only(ctx, mul.into(), add.into(), || -> Box<dyn Processor> {
            Box::new(PinkUnit(oscillator::PinkNoise::new()))
        })?;
        Ok(Self { core })
    }

    setters! {
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(PinkNoise);

/// Brown noise (-6 dB per octave).
pub struct BrownNoise {
    core: ProxyCore,
}

impl BrownNoise {
    pub fn new(ctx: &EngineContext, mul: impl Into<Arg>, add: impl Into<Arg>) -> Result<Self> {
        let core = post_only(ctx, mul.into(), add.into(), || -> Box<dyn Processor> {
            Box::new(BrownUnit(oscillator::BrownNoise::new()))
        })?;
        Ok(Self { core })
    }

    setters! {
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(BrownNoise);

// ---------------------------------------------------------------------------
// Fm

struct FmUnit {
    osc: FmOsc,
    carrier: f32,
    ratio: f32,
    index: f32,
}

impl Processor for FmUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.osc
            .render(out, self.carrier, self.ratio, self.index, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "carrier" => self.carrier = value.expect_f32(name)?,
            "ratio" => self.ratio = value.expect_f32(name)?,
            "index" => self.index = value.expect_f32(name)?,
            _ => return unknown(name),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FmParams {
    /// Carrier frequency in Hz
    pub carrier: Arg,
    /// Modulator frequency as a multiple of the carrier
    pub ratio: Arg,
    /// Modulation index
    pub index: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for FmParams {
    fn default() -> Self {
        Self {
            carrier: Arg::from(100.0),
            ratio: Arg::from(0.5),
            index: Arg::from(5.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Two-operator frequency modulation.
pub struct Fm {
    core: ProxyCore,
}

impl Fm {
    pub fn new(ctx: &EngineContext, params: FmParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("carrier", params.carrier),
                ("ratio", params.ratio),
                ("index", params.index),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let processor = FmUnit {
                osc: FmOsc::new(),
                carrier: args.f32("carrier", ch)?,
                ratio: args.f32("ratio", ch)?,
                index: args.f32("index", ch)?,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_carrier => "carrier",
        set_ratio => "ratio",
        set_index => "index",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Fm);

struct CrossFmUnit {
    osc: CrossFmOsc,
    carrier: f32,
    ratio: f32,
    ind1: f32,
    ind2: f32,
}

impl Processor for CrossFmUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.osc.render(
            out,
            self.carrier,
            self.ratio,
            self.ind1,
            self.ind2,
            ctx.sample_rate,
        );
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "carrier" => self.carrier = value.expect_f32(name)?,
            "ratio" => self.ratio = value.expect_f32(name)?,
            "ind1" => self.ind1 = value.expect_f32(name)?,
            "ind2" => self.ind2 = value.expect_f32(name)?,
            _ => return unknown(name),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossFmParams {
    /// Carrier frequency in Hz
    pub carrier: Arg,
    /// Modulator frequency as a multiple of the carrier
    pub ratio: Arg,
    /// Carrier index, how much the carrier bends the modulator
    pub ind1: Arg,
    /// Modulator index, how much the modulator bends the carrier
    pub ind2: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for CrossFmParams {
    fn default() -> Self {
        Self {
            carrier: Arg::from(100.0),
            ratio: Arg::from(0.5),
            ind1: Arg::from(2.0),
            ind2: Arg::from(2.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Two oscillators modulating each other's frequency.
pub struct CrossFm {
    core: ProxyCore,
}

impl CrossFm {
    pub fn new(ctx: &EngineContext, params: CrossFmParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("carrier", params.carrier),
                ("ratio", params.ratio),
                ("ind1", params.ind1),
                ("ind2", params.ind2),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let processor = CrossFmUnit {
                osc: CrossFmOsc::new(),
                carrier: args.f32("carrier", ch)?,
                ratio: args.f32("ratio", ch)?,
                ind1: args.f32("ind1", ch)?,
                ind2: args.f32("ind2", ch)?,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_carrier => "carrier",
        set_ratio => "ratio",
        set_ind1 => "ind1",
        set_ind2 => "ind2",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(CrossFm);

// ---------------------------------------------------------------------------
// Lfo

struct LfoUnit {
    lfo: LfoKernel,
    freq: f32,
    sharp: f32,
}

impl Processor for LfoUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.lfo.render(out, self.freq, self.sharp, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "freq" => self.freq = value.expect_f32(name)?,
            "sharp" => self.sharp = value.expect_f32(name)?,
            "type" => self.lfo.shape = LfoShape::from_index(value.expect_int(name)?),
            _ => return unknown(name),
        }
        Ok(())
    }

    fn on_play(&mut self) {
        self.lfo.reset();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LfoParams {
    /// Hz, default 100
    pub freq: Arg,
    /// Sharpness of the waveform, 0..1
    pub sharp: Arg,
    /// 0 saw up, 1 saw down, 2 square, 3 triangle, 4 pulse,
    /// 5 bipolar pulse, 6 sample and hold, 7 modulated sine
    pub kind: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            freq: Arg::from(100.0),
            sharp: Arg::from(0.5),
            kind: Arg::from(0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Low frequency oscillator with eight shapes.
pub struct Lfo {
    core: ProxyCore,
}

impl Lfo {
    pub fn new(ctx: &EngineContext, params: LfoParams) -> Result<Self> {
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("freq", params.freq),
                ("sharp", params.sharp),
                ("type", params.kind),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(None)?;
        for ch in 0..args.len() {
            let processor = LfoUnit {
                lfo: LfoKernel::new(LfoShape::from_index(args.int("type", ch)?)),
                freq: args.f32("freq", ch)?,
                sharp: args.f32("sharp", ch)?,
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }
        Ok(Self { core })
    }

    setters! {
        set_freq => "freq",
        set_sharp => "sharp",
        set_type => "type",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Lfo);

// ---------------------------------------------------------------------------
// Osc

struct OscUnit {
    table: SharedTable,
    incoming: Mailbox<SharedTable>,
    phase: Phase,
    freq: f32,
    offset: f32,
    interp: Interp,
}

impl Processor for OscUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        if let Some(table) = self.incoming.try_take() {
            self.table = table;
        }
        let Some(data) = self.table.try_read() else {
            out.fill(0.0);
            return;
        };
        let points = &data[..data.len().saturating_sub(1)];
        let size = points.len() as f32;
        for sample in out.iter_mut() {
            let phase = (self.phase.next(self.freq, ctx.sample_rate) + self.offset).rem_euclid(1.0);
            *sample = self.interp.read(points, phase * size, true);
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "freq" => self.freq = value.expect_f32(name)?,
            "phase" => self.offset = value.expect_f32(name)?,
            "interp" => self.interp = Interp::from_index(value.expect_int(name)?),
            _ => return unknown(name),
        }
        Ok(())
    }

    fn on_play(&mut self) {
        self.phase.reset();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscParams {
    pub freq: Arg,
    pub phase: Arg,
    /// 1 none, 2 linear, 3 cosine, 4 cubic
    pub interp: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for OscParams {
    fn default() -> Self {
        Self {
            freq: Arg::from(1000.0),
            phase: Arg::from(0.0),
            interp: Arg::from(2),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Periodic table reader. A multichannel table gives one channel per stream.
pub struct Osc {
    core: ProxyCore,
    mailboxes: Vec<Mailbox<SharedTable>>,
}

impl Osc {
    pub fn new(ctx: &EngineContext, table: &dyn Table, params: OscParams) -> Result<Self> {
        let streams = table.streams();
        if streams.is_empty() {
            return Err(Error::EmptyBroadcastInput {
                param: "table".into(),
            });
        }
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("freq", params.freq),
                ("phase", params.phase),
                ("interp", params.interp),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        let mut mailboxes = Vec::with_capacity(args.len());
        for ch in 0..args.len() {
            let incoming = Mailbox::new();
            let processor = OscUnit {
                table: streams[ch % streams.len()].clone(),
                incoming: incoming.clone(),
                phase: Phase::new(),
                freq: args.f32("freq", ch)?,
                offset: args.f32("phase", ch)?,
                interp: Interp::from_index(args.int("interp", ch)?),
            };
            core.push_channel(vec![unit(processor, vec![])])?;
            mailboxes.push(incoming);
        }
        Ok(Self { core, mailboxes })
    }

    /// Read from another table, starting with the next block.
    pub fn set_table(&mut self, table: &dyn Table) -> Result<()> {
        let streams = table.streams();
        if streams.is_empty() {
            return Err(Error::EmptyBroadcastInput {
                param: "table".into(),
            });
        }
        for (ch, mailbox) in self.mailboxes.iter().enumerate() {
            mailbox.post(streams[ch % streams.len()].clone());
        }
        Ok(())
    }

    setters! {
        set_freq => "freq",
        set_phase => "phase",
        set_interp => "interp",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Osc);
