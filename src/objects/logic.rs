//! Sample-and-hold and comparison.

use super::{impl_proxy, input_streams, setters, unit, OutputKind, ProxyCore, Source};
use crate::{
    broadcast::{Arg, Value},
    engine::{Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

/// Half width of the window around `value` that triggers a sample.
const HOLD_WINDOW: f32 = 0.001;

struct SampHoldUnit {
    value: f32,
    held: f32,
    armed: bool,
}

impl Processor for SampHoldUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let (input, control) = (inputs.get(0), inputs.get(1));
        for ((o, &x), &c) in out.iter_mut().zip(input).zip(control) {
            if (c - self.value).abs() < HOLD_WINDOW {
                if self.armed {
                    self.held = x;
                    self.armed = false;
                }
            } else {
                self.armed = true;
            }
            *o = self.held;
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "value" => self.value = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampHoldParams {
    /// Control level that takes a new sample
    pub value: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SampHoldParams {
    fn default() -> Self {
        Self {
            value: Arg::from(0.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Samples its input when the control signal reaches `value`, then holds
/// until the control leaves and comes back.
pub struct SampHold {
    core: ProxyCore,
}

impl SampHold {
    pub fn new(
        ctx: &EngineContext,
        input: &dyn Source,
        control: &dyn Source,
        params: SampHoldParams,
    ) -> Result<Self> {
        let streams = input_streams(input)?;
        let controls = input_streams(control)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![("value", params.value), ("mul", params.mul), ("add", params.add)],
        );
        let args = core.broadcast(Some(streams.len().max(controls.len())))?;
        for ch in 0..args.len() {
            let processor = SampHoldUnit {
                value: args.f32("value", ch)?,
                held: 0.0,
                armed: true,
            };
            let inputs = streams.wrap(ch).into_iter().chain(controls.wrap(ch)).collect();
            core.push_channel(vec![unit(processor, inputs)])?;
        }
        Ok(Self { core })
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    pub fn set_control(&mut self, control: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(1, control, fadetime)
    }

    setters! {
        set_value => "value",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(SampHold);

// ---------------------------------------------------------------------------

/// Relation tested by [`Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl CompareMode {
    pub fn parse(mode: &str) -> Result<Self> {
        Ok(match mode {
            "<" => CompareMode::Less,
            "<=" => CompareMode::LessEqual,
            ">" => CompareMode::Greater,
            ">=" => CompareMode::GreaterEqual,
            "==" => CompareMode::Equal,
            "!=" => CompareMode::NotEqual,
            _ => return Err(Error::InvalidFormat(format!("unknown comparison '{mode}'"))),
        })
    }

    #[inline]
    pub fn test(self, a: f32, b: f32) -> bool {
        match self {
            CompareMode::Less => a < b,
            CompareMode::LessEqual => a <= b,
            CompareMode::Greater => a > b,
            CompareMode::GreaterEqual => a >= b,
            CompareMode::Equal => a == b,
            CompareMode::NotEqual => a != b,
        }
    }
}

struct CompareUnit {
    comp: f32,
    mode: CompareMode,
}

impl Processor for CompareUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        for (o, &x) in out.iter_mut().zip(inputs.get(0)) {
            *o = if self.mode.test(x, self.comp) { 1.0 } else { 0.0 };
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "comp" => self.comp = value.expect_f32(name)?,
            "mode" => self.mode = CompareMode::parse(value.expect_str(name)?)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareParams {
    /// Right-hand side of the comparison
    pub comp: Arg,
    /// One of `<`, `<=`, `>`, `>=`, `==`, `!=`
    pub mode: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for CompareParams {
    fn default() -> Self {
        Self {
            comp: Arg::from(0.5),
            mode: Arg::from("<"),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Outputs 1 where `input <mode> comp` holds, 0 elsewhere.
pub struct Compare {
    core: ProxyCore,
}

impl Compare {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: CompareParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("comp", params.comp),
                ("mode", params.mode),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let processor = CompareUnit {
                comp: args.f32("comp", ch)?,
                mode: CompareMode::parse(args.str("mode", ch)?)?,
            };
            let inputs = streams.wrap(ch).into_iter().collect();
            core.push_channel(vec![unit(processor, inputs)])?;
        }
        Ok(Self { core })
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_comp => "comp",
        set_mode => "mode",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Compare);
