//! Multichannel panners, the output switcher and the input selector.
//!
//! Panners and the switcher give each input channel a group of `outs` units,
//! one per output, so `out()` with the default increment lays every group
//! over consecutive outputs.

use super::{impl_proxy, input_streams, setters, unit, OutputKind, ProxyCore, Source};
use crate::{
    broadcast::{Arg, Value},
    dsp::pan::{pan_gain, span_gain, voice_gain},
    engine::{Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

#[derive(Debug, Clone, Copy)]
enum Law {
    Cosine { spread: f32 },
    Adjacent,
    /// Crossfade between neighbours on a line, set through `voice`
    Voice,
}

struct PanUnit {
    j: usize,
    outs: usize,
    position: f32,
    law: Law,
}

impl PanUnit {
    fn gain(&self) -> f32 {
        match self.law {
            Law::Cosine { spread } => pan_gain(self.j, self.outs, self.position, spread),
            Law::Adjacent => span_gain(self.j, self.outs, self.position),
            Law::Voice => voice_gain(self.j, self.outs, self.position),
        }
    }
}

impl Processor for PanUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let gain = self.gain();
        for (o, &x) in out.iter_mut().zip(inputs.get(0)) {
            *o = x * gain;
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match (name, &mut self.law) {
            ("pan", Law::Cosine { .. } | Law::Adjacent) => self.position = value.expect_f32(name)?,
            ("voice", Law::Voice) => self.position = value.expect_f32(name)?,
            ("spread", Law::Cosine { spread }) => *spread = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

fn check_outs(outs: usize) -> Result<usize> {
    if outs == 0 {
        return Err(Error::EmptyBroadcastInput {
            param: "outs".into(),
        });
    }
    Ok(outs)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanParams {
    /// Number of outputs per input channel, fixed at creation
    pub outs: usize,
    /// Position, 0 = first output, 1 = last
    pub pan: Arg,
    /// Width of the cosine lobe with more than two outputs
    pub spread: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for PanParams {
    fn default() -> Self {
        Self {
            outs: 2,
            pan: Arg::from(0.5),
            spread: Arg::from(0.5),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Cosine-law panner.
pub struct Pan {
    core: ProxyCore,
    outs: usize,
}

impl Pan {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: PanParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let outs = check_outs(params.outs)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("pan", params.pan),
                ("spread", params.spread),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let pan = args.f32("pan", ch)?;
            let spread = args.f32("spread", ch)?;
            let source: Vec<_> = streams.wrap(ch).into_iter().collect();
            let group = (0..outs)
                .map(|j| {
                    let law = Law::Cosine { spread };
                    unit(PanUnit { j, outs, position: pan, law }, source.clone())
                })
                .collect();
            core.push_channel(group)?;
        }
        Ok(Self { core, outs })
    }

    pub fn outs(&self) -> usize {
        self.outs
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_pan => "pan",
        set_spread => "spread",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Pan);

#[derive(Debug, Clone, PartialEq)]
pub struct SPanParams {
    pub outs: usize,
    pub pan: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SPanParams {
    fn default() -> Self {
        Self {
            outs: 2,
            pan: Arg::from(0.5),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Equal-power panner between adjacent outputs.
pub struct SPan {
    core: ProxyCore,
    outs: usize,
}

impl SPan {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: SPanParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let outs = check_outs(params.outs)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![("pan", params.pan), ("mul", params.mul), ("add", params.add)],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let pan = args.f32("pan", ch)?;
            let source: Vec<_> = streams.wrap(ch).into_iter().collect();
            let group = (0..outs)
                .map(|j| {
                    let law = Law::Adjacent;
                    unit(PanUnit { j, outs, position: pan, law }, source.clone())
                })
                .collect();
            core.push_channel(group)?;
        }
        Ok(Self { core, outs })
    }

    pub fn outs(&self) -> usize {
        self.outs
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_pan => "pan",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(SPan);

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchParams {
    /// Number of outputs per input channel, fixed at creation
    pub outs: usize,
    /// Output position, 0..outs-1, fractional values crossfade
    pub voice: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SwitchParams {
    fn default() -> Self {
        Self {
            outs: 2,
            voice: Arg::from(0.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Sends each input channel to one of `outs` outputs.
pub struct Switch {
    core: ProxyCore,
    outs: usize,
}

impl Switch {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: SwitchParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let outs = check_outs(params.outs)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![("voice", params.voice), ("mul", params.mul), ("add", params.add)],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let position = args.f32("voice", ch)?;
            let source: Vec<_> = streams.wrap(ch).into_iter().collect();
            let group = (0..outs)
                .map(|j| {
                    let law = Law::Voice;
                    unit(PanUnit { j, outs, position, law }, source.clone())
                })
                .collect();
            core.push_channel(group)?;
        }
        Ok(Self { core, outs })
    }

    pub fn outs(&self) -> usize {
        self.outs
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_voice => "voice",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Switch);

struct SelectUnit {
    count: usize,
    voice: f32,
}

impl Processor for SelectUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        out.fill(0.0);
        for k in 0..self.count {
            let gain = voice_gain(k, self.count, self.voice);
            if gain == 0.0 {
                continue;
            }
            for (o, &x) in out.iter_mut().zip(inputs.get(k)) {
                *o += x * gain;
            }
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "voice" => self.voice = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorParams {
    /// Input position, 0..inputs-1, fractional values crossfade
    pub voice: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for SelectorParams {
    fn default() -> Self {
        Self {
            voice: Arg::from(0.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Crossfades between several inputs.
///
/// The channel count follows the input with the most streams; channel `ch`
/// reads stream `ch` of every input, wrapping around.
pub struct Selector {
    core: ProxyCore,
    inputs: usize,
}

impl Selector {
    pub fn new(ctx: &EngineContext, inputs: &[&dyn Source], params: SelectorParams) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::EmptyBroadcastInput {
                param: "inputs".into(),
            });
        }
        let sources = inputs
            .iter()
            .map(|&input| input_streams(input))
            .collect::<Result<Vec<_>>>()?;
        let widest = sources.iter().map(|s| s.len()).max().unwrap_or(1);

        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![("voice", params.voice), ("mul", params.mul), ("add", params.add)],
        );
        let args = core.broadcast(Some(widest))?;
        for ch in 0..args.len() {
            let processor = SelectUnit {
                count: sources.len(),
                voice: args.f32("voice", ch)?,
            };
            let ids = sources.iter().filter_map(|s| s.wrap(ch)).collect();
            core.push_channel(vec![unit(processor, ids)])?;
        }
        Ok(Self {
            core,
            inputs: sources.len(),
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Replace input `k`.
    pub fn set_input(&mut self, k: usize, input: &dyn Source, fadetime: f32) -> Result<()> {
        if k >= self.inputs {
            return Err(Error::IndexOutOfRange {
                index: k,
                len: self.inputs,
            });
        }
        self.core.set_input(k, input, fadetime)
    }

    setters! {
        set_voice => "voice",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Selector);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::testing::{ctx, run};
    use crate::objects::{Proxy, ProxyExt, Sine, SineParams, Source};

    /// `channels` constant streams at 1.0.
    fn dc(ctx: &EngineContext, channels: usize) -> Sine {
        Sine::new(ctx, SineParams {
            freq: Arg::from(vec![0.0; channels]),
            phase: Arg::from(0.25),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn stereo_center_is_equal_power() {
        let ctx = ctx();
        let src = dc(&ctx, 1);
        let mut pan = Pan::new(&ctx, &src, PanParams::default()).unwrap();
        assert_eq!(pan.core().channels(), 1);
        assert_eq!(pan.core().handles().len(), 2);

        pan.out().unwrap();
        let out = run(&ctx, 1);
        let expected = 0.5f32.sqrt();
        assert!((out[0] - expected).abs() < 1e-5);
        assert!((out[1] - expected).abs() < 1e-5);
    }

    #[test]
    fn groups_follow_input_channels() {
        let ctx = ctx();
        let src = dc(&ctx, 2);
        let pan = SPan::new(&ctx, &src, SPanParams {
            outs: 4,
            pan: vec![0.0, 0.25].into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(pan.core().group(), 4);
        assert_eq!(pan.streams().len(), 8);

        run(&ctx, 1);
        let values = pan.core().values().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-5, "first channel on output 0");
        assert!((values[5] - 1.0).abs() < 1e-5, "second channel on output 1");
    }

    #[test]
    fn set_pan_moves_every_member() {
        let ctx = ctx();
        let src = dc(&ctx, 1);
        let mut pan = Pan::new(&ctx, &src, PanParams::default()).unwrap();
        pan.set_pan(1.0).unwrap();
        run(&ctx, 1);
        let values = pan.core().values().unwrap();
        assert!(values[0].abs() < 1e-5);
        assert!((values[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn spread_is_not_an_span_attribute() {
        let ctx = ctx();
        let src = dc(&ctx, 1);
        let mut span = SPan::new(&ctx, &src, SPanParams::default()).unwrap();
        assert_eq!(span.attributes(), vec!["pan", "mul", "add"]);
        assert!(span.set_attr("spread", Arg::from(0.2)).is_err());
        assert!(SPan::new(&ctx, &src, SPanParams { outs: 0, ..Default::default() }).is_err());
    }

    #[test]
    fn switch_moves_the_signal_between_outputs() {
        let ctx = ctx();
        let src = dc(&ctx, 1);
        let mut switch = Switch::new(&ctx, &src, SwitchParams {
            outs: 3,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(switch.streams().len(), 3);

        run(&ctx, 1);
        let values = switch.core().values().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-5);
        assert!(values[1].abs() < 1e-5 && values[2].abs() < 1e-5);

        switch.set_voice(1.5).unwrap();
        run(&ctx, 1);
        let values = switch.core().values().unwrap();
        assert!(values[0].abs() < 1e-5);
        assert!((values[1] - 0.5f32.sqrt()).abs() < 1e-5);
        assert!((values[2] - 0.5f32.sqrt()).abs() < 1e-5);
        assert!(switch.set_attr("pan", Arg::from(0.5)).is_err());
    }

    #[test]
    fn selector_crossfades_inputs() {
        let ctx = ctx();
        let low = Sine::new(&ctx, SineParams {
            freq: Arg::from(0.0),
            phase: Arg::from(0.25),
            mul: Arg::from(0.25),
            ..Default::default()
        })
        .unwrap();
        let high = dc(&ctx, 2);
        let inputs: [&dyn Source; 2] = [&low, &high];
        let mut select = Selector::new(&ctx, &inputs, SelectorParams::default()).unwrap();
        assert_eq!(select.core().channels(), 2);

        run(&ctx, 1);
        let values = select.core().values().unwrap();
        assert!((values[0] - 0.25).abs() < 1e-5);
        assert!((values[1] - 0.25).abs() < 1e-5, "the mono input wraps");

        select.set_voice(1.0).unwrap();
        run(&ctx, 1);
        assert!((select.core().values().unwrap()[0] - 1.0).abs() < 1e-5);

        select.set_voice(0.5).unwrap();
        run(&ctx, 1);
        let expected = 0.25 * 0.5f32.sqrt() + 0.5f32.sqrt();
        assert!((select.core().values().unwrap()[0] - expected).abs() < 1e-5);

        assert!(select.set_input(2, &low, 0.0).is_err());
        assert!(Selector::new(&ctx, &[], SelectorParams::default()).is_err());
    }
}
