//! User-facing proxy objects.
//!
//! A proxy stores its parameters, broadcasts them over channels and owns the
//! engine units (through [`Handle`]s) that do the work. Every mutation goes
//! through the same path: store the new argument, then forward the value each
//! channel gets to that channel's units.

/*
Channels, groups and streams
============================

Most objects create one unit per channel. Some create a fixed group per
channel (a panner creates `outs` units, a note reader a pitch/velocity pair):

  channel:      0           1           2
  handles:   [p0 v0]     [p1 v1]     [p2 v2]        group = 2

Handle `h` belongs to channel `h / group`, and a parameter forwarded to it
uses `wrap(arg, h / group)`. The flat handle list is the object's `Streams`:
what a downstream object reads, and what `out` spreads over the outputs:

  out(chnl = 0, inc = 1)    → handle h plays on output  0 + h * 1
  out(chnl = [1, 0])        → handle h plays on output  wrap([1, 0], h)
*/

pub mod delay;
pub mod dynamics;
pub mod filters;
pub mod generators;
pub mod logic;
pub mod midi;
pub mod network;
pub mod pan;
#[cfg(feature = "rtrb")]
pub mod record;
pub(crate) mod shared;

pub use delay::{Delay, DelayParams};
pub use dynamics::{
    Clip, Compress, CompressParams, Degrade, DegradeParams, Disto, DistoParams, Gate, GateParams, Mirror,
    RangeParams, Wrap,
};
pub use filters::{Svf, SvfParams};
pub use generators::{
    BrownNoise, CrossFm, CrossFmParams, Fm, FmParams, Lfo, LfoParams, Noise, NoiseParams, Osc, OscParams,
    Phasor, PhasorParams, PinkNoise, Sine, SineLoop, SineLoopParams, SineParams,
};
pub use logic::{Compare, CompareMode, CompareParams, SampHold, SampHoldParams};
pub use midi::{MidiAdsr, MidiAdsrParams, Midictl, MidictlParams, Notein, NoteinParams, NoteScale};
pub use network::{OscDataReceive, OscDataSend, OscReceive, OscSend};
pub use pan::{Pan, PanParams, SPan, SPanParams, Selector, SelectorParams, Switch, SwitchParams};
#[cfg(feature = "rtrb")]
pub use record::{
    ControlRead, ControlReadParams, ControlRec, FileFormat, NoteinRead, NoteinReadParams, NoteinRec,
    Record, RecordParams, SampleType,
};

use tracing::trace;

use crate::{
    broadcast::{broadcast, Arg, Broadcast},
    engine::{EngineContext, Handle, Processor, UnitId},
    Error, Result,
};

/// Whether an object may be routed to the audio outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Audio,
    /// `out` is a no-op; the signal never reaches the outputs.
    ControlOnly,
}

/// Unit ids of an object's output streams, in handle order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Streams(Vec<UnitId>);

impl Streams {
    pub fn new(ids: Vec<UnitId>) -> Self {
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> &[UnitId] {
        &self.0
    }

    /// Stream read by channel `i`, wrapping around.
    pub fn wrap(&self, i: usize) -> Option<UnitId> {
        match self.0.len() {
            0 => None,
            len => Some(self.0[i % len]),
        }
    }
}

/// Anything whose streams can feed another object's input.
///
/// The stream count is the broadcast hint of the object reading it.
pub trait Source {
    fn streams(&self) -> Streams;
}

impl Source for Streams {
    fn streams(&self) -> Streams {
        self.clone()
    }
}

impl<P: Proxy> Source for P {
    fn streams(&self) -> Streams {
        self.core().streams()
    }
}

/// Streams of `input`, failing when it has none.
pub(crate) fn input_streams(input: &dyn Source) -> Result<Streams> {
    let streams = input.streams();
    if streams.is_empty() {
        return Err(Error::EmptyBroadcastInput {
            param: "input".into(),
        });
    }
    Ok(streams)
}

/// A processor with its inputs, ready for [`ProxyCore::push_channel`].
pub(crate) fn unit<P: Processor + 'static>(processor: P, inputs: Vec<UnitId>) -> (Box<dyn Processor>, Vec<UnitId>) {
    (Box::new(processor), inputs)
}

/// State and handles shared by every proxy.
pub struct ProxyCore {
    ctx: EngineContext,
    kind: OutputKind,
    attrs: Vec<(&'static str, Arg)>,
    handles: Vec<Handle>,
    group: usize,
    post_member: Option<usize>,
}

impl ProxyCore {
    pub(crate) fn new(ctx: &EngineContext, kind: OutputKind, attrs: Vec<(&'static str, Arg)>) -> Self {
        Self {
            ctx: ctx.clone(),
            kind,
            attrs,
            handles: Vec::new(),
            group: 1,
            post_member: None,
        }
    }

    /// Restrict `mul`/`add` to one member of each group.
    pub(crate) fn post_on_member(mut self, member: usize) -> Self {
        self.post_member = Some(member);
        self
    }

    /// Broadcast every stored attribute.
    pub(crate) fn broadcast(&self, hint: Option<usize>) -> Result<Broadcast> {
        let params: Vec<(&str, &Arg)> = self.attrs.iter().map(|(name, arg)| (*name, arg)).collect();
        broadcast(&params, hint)
    }

    /// Add the units of the next channel, then apply its `mul`/`add`.
    pub(crate) fn push_channel(&mut self, units: Vec<(Box<dyn Processor>, Vec<UnitId>)>) -> Result<()> {
        if self.handles.is_empty() {
            self.group = units.len().max(1);
        }
        let channel = self.handles.len() / self.group;
        let mut post = Vec::with_capacity(2);
        for name in ["mul", "add"] {
            if let Some(arg) = self.attr(name) {
                let value = arg.wrap_named(name, channel)?;
                value.expect_f32(name)?;
                post.push((name, value.clone()));
            }
        }

        let first = self.handles.len();
        for (processor, inputs) in units {
            self.handles.push(self.ctx.add_unit(processor, &inputs)?);
        }
        for (name, value) in &post {
            for (member, handle) in self.handles[first..].iter().enumerate() {
                if self.post_member.map_or(true, |m| m == member) {
                    handle.set_param(name, value)?;
                }
            }
        }
        Ok(())
    }

    pub fn ctx(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn attr(&self, name: &str) -> Option<&Arg> {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, arg)| arg)
    }

    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.attrs.iter().map(|(name, _)| *name).collect()
    }

    /// Replace a stored attribute and forward it to every handle.
    ///
    /// A longer sequence than the channel count does not add channels; each
    /// channel takes `wrap(arg, channel)`.
    pub fn set(&mut self, name: &str, arg: Arg) -> Result<()> {
        let index = self
            .attrs
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or_else(|| Error::UnknownParam(name.to_string()))?;
        if arg.seq_len() == Some(0) {
            return Err(Error::EmptyBroadcastInput { param: name.into() });
        }

        let is_post = matches!(name, "mul" | "add");
        let targets: Vec<usize> = (0..self.handles.len())
            .filter(|h| !(is_post && self.post_member.is_some_and(|m| m != h % self.group)))
            .collect();
        if is_post {
            for &h in &targets {
                arg.wrap_named(name, h / self.group)?.expect_f32(name)?;
            }
        }

        for (done, &h) in targets.iter().enumerate() {
            let value = arg.wrap_named(name, h / self.group)?;
            if let Err(err) = self.handles[h].set_param(name, value) {
                // put the handles already updated back on the stored argument
                let previous = &self.attrs[index].1;
                for &k in &targets[..done] {
                    if let Ok(old) = previous.wrap_named(name, k / self.group) {
                        let _ = self.handles[k].set_param(name, old);
                    }
                }
                return Err(err);
            }
        }

        trace!(attr = name, ?arg, "attribute set");
        self.attrs[index].1 = arg;
        Ok(())
    }

    /// Swap input `k` of every handle for the matching stream of `source`.
    pub fn set_input(&self, k: usize, source: &dyn Source, fadetime: f32) -> Result<()> {
        let streams = input_streams(source)?;
        for (h, handle) in self.handles.iter().enumerate() {
            if let Some(id) = streams.wrap(h / self.group) {
                handle.set_input(k, id, fadetime)?;
            }
        }
        Ok(())
    }

    pub fn play(&self, dur: f32, delay: f32) -> Result<()> {
        for handle in &self.handles {
            handle.play(dur, delay)?;
        }
        Ok(())
    }

    /// Route every handle to an output and play it. Does nothing for
    /// control-only objects.
    pub fn out(&self, chnl: &Arg, inc: usize, dur: f32, delay: f32) -> Result<()> {
        if self.kind == OutputKind::ControlOnly {
            return Ok(());
        }
        for (k, handle) in self.handles.iter().enumerate() {
            let channel = match chnl {
                Arg::Scalar(value) => value.expect_int("chnl")? + (k * inc) as i64,
                Arg::Seq(_) => chnl.wrap_named("chnl", k)?.expect_int("chnl")?,
            };
            let channel = usize::try_from(channel).map_err(|_| Error::TypeMismatch {
                param: "chnl".into(),
                expected: "a non-negative channel",
            })?;
            handle.out(channel, dur, delay)?;
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        for handle in &self.handles {
            handle.stop()?;
        }
        Ok(())
    }

    pub fn handle(&self, index: usize) -> Result<&Handle> {
        self.handles.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.handles.len(),
        })
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn channels(&self) -> usize {
        self.handles.len() / self.group
    }

    pub fn streams(&self) -> Streams {
        Streams::new(self.handles.iter().map(Handle::id).collect())
    }

    /// Member `member` of every group, e.g. the velocity streams of a note
    /// object.
    pub fn member_streams(&self, member: usize) -> Streams {
        Streams::new(
            self.handles
                .iter()
                .skip(member)
                .step_by(self.group)
                .map(Handle::id)
                .collect(),
        )
    }

    /// First sample of every handle's last block.
    pub fn values(&self) -> Result<Vec<f32>> {
        self.handles.iter().map(Handle::value).collect()
    }

    pub fn is_playing(&self) -> bool {
        self.handles.iter().any(Handle::is_playing)
    }
}

impl std::fmt::Debug for ProxyCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCore")
            .field("kind", &self.kind)
            .field("attrs", &self.attrs)
            .field("handles", &self.handles)
            .field("group", &self.group)
            .finish()
    }
}

/// Object-safe interface shared by every proxy.
pub trait Proxy: Send {
    fn core(&self) -> &ProxyCore;

    fn core_mut(&mut self) -> &mut ProxyCore;

    /// Attributes settable through [`Proxy::set_attr`].
    fn attributes(&self) -> Vec<&'static str> {
        self.core().attribute_names()
    }

    /// Generic setter used by the command router.
    fn set_attr(&mut self, name: &str, value: Arg) -> Result<()> {
        self.core_mut().set(name, value)
    }

    fn play_with(&mut self, dur: f32, delay: f32) -> Result<()> {
        self.core().play(dur, delay)
    }

    fn out_with(&mut self, chnl: &Arg, inc: usize, dur: f32, delay: f32) -> Result<()> {
        self.core().out(chnl, inc, dur, delay)
    }

    fn stop(&mut self) -> Result<()> {
        self.core().stop()
    }
}

/// Chaining shorthands over [`Proxy`].
pub trait ProxyExt: Proxy + Sized {
    fn play(&mut self) -> Result<&mut Self> {
        self.play_with(0.0, 0.0)?;
        Ok(self)
    }

    fn out(&mut self) -> Result<&mut Self> {
        self.out_with(&Arg::from(0), 1, 0.0, 0.0)?;
        Ok(self)
    }

    fn out_to(&mut self, chnl: impl Into<Arg>) -> Result<&mut Self> {
        self.out_with(&chnl.into(), 1, 0.0, 0.0)?;
        Ok(self)
    }
}

impl<P: Proxy> ProxyExt for P {}

macro_rules! impl_proxy {
    ($ty:ty) => {
        impl $crate::objects::Proxy for $ty {
            fn core(&self) -> &$crate::objects::ProxyCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut $crate::objects::ProxyCore {
                &mut self.core
            }
        }
    };
}

/// `set_<field>` methods forwarding to [`ProxyCore::set`].
macro_rules! setters {
    ($($fn_name:ident => $attr:literal),* $(,)?) => {
        $(
            pub fn $fn_name(&mut self, value: impl Into<$crate::broadcast::Arg>) -> $crate::Result<()> {
                self.core.set($attr, value.into())
            }
        )*
    };
}

pub(crate) use {impl_proxy, setters};
