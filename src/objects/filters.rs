use super::{impl_proxy, input_streams, setters, unit, OutputKind, ProxyCore, Source};
use crate::{
    broadcast::{Arg, Value},
    dsp::filter::{FilterType, SVFilter},
    engine::{Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

/// Filter response from an index (0..3) or a name such as `"bandpass"`.
fn filter_type(name: &str, value: &Value) -> Result<FilterType> {
    match value {
        Value::Str(s) => FilterType::from_name(s).ok_or(Error::TypeMismatch {
            param: name.into(),
            expected: "lowpass, highpass, bandpass or notch",
        }),
        other => Ok(FilterType::from_index(other.expect_int(name)?)),
    }
}

struct SvfUnit {
    filter: SVFilter,
}

impl Processor for SvfUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.filter.render(inputs.get(0), out, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "freq" => self.filter.set_cutoff(value.expect_f32(name)?),
            "q" => self.filter.set_q(value.expect_f32(name)?),
            "type" => self.filter.filter_type = filter_type(name, value)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    fn on_play(&mut self) {
        self.filter.reset();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvfParams {
    /// Cutoff or center frequency in Hz
    pub freq: Arg,
    /// Resonance, clamped to 0.5..500
    pub q: Arg,
    /// 0 lowpass, 1 highpass, 2 bandpass, 3 notch (names accepted too)
    pub kind: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SvfParams {
    fn default() -> Self {
        Self {
            freq: Arg::from(1000.0),
            q: Arg::from(0.5),
            kind: Arg::from(0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// State-variable filter.
pub struct Svf {
    core: ProxyCore,
}

impl Svf {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: SvfParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("freq", params.freq),
                ("q", params.q),
                ("type", params.kind),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let kind = filter_type("type", args.value("type", ch)?)?;
            let filter = SVFilter::new(kind, args.f32("freq", ch)?, args.f32("q", ch)?);
            let inputs = streams.wrap(ch).into_iter().collect();
            core.push_channel(vec![unit(SvfUnit { filter }, inputs)])?;
        }
        Ok(Self { core })
    }

    /// Crossfade to another input over `fadetime` seconds.
    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_freq => "freq",
        set_q => "q",
        set_type => "type",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Svf);
