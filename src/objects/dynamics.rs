//! Range folding, waveshaping, bit reduction and dynamics processing.

use super::{impl_proxy, input_streams, setters, unit, OutputKind, ProxyCore, Source};
use crate::{
    broadcast::{Arg, Value},
    dsp::{
        distortion::{self, Degrade as DegradeKernel, Disto as DistoKernel},
        dynamics::{Compressor, CompressorSettings, Gate as GateKernel, GateSettings},
    },
    engine::{Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

#[derive(Debug, Clone, Copy)]
enum RangeMode {
    Clip,
    Mirror,
    Wrap,
}

struct RangeUnit {
    mode: RangeMode,
    min: f32,
    max: f32,
}

impl Processor for RangeUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let fold = match self.mode {
            RangeMode::Clip => distortion::clip,
            RangeMode::Mirror => distortion::mirror,
            RangeMode::Wrap => distortion::wrap,
        };
        for (o, &x) in out.iter_mut().zip(inputs.get(0)) {
            *o = fold(x, self.min, self.max);
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "min" => self.min = value.expect_f32(name)?,
            "max" => self.max = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

/// Bounds for [`Clip`], [`Mirror`] and [`Wrap`].
#[derive(Debug, Clone, PartialEq)]
pub struct RangeParams {
    pub min: Arg,
    pub max: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl RangeParams {
    pub fn new(min: impl Into<Arg>, max: impl Into<Arg>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

impl Default for RangeParams {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

fn range_core(
    ctx: &EngineContext,
    input: &dyn Source,
    params: RangeParams,
    mode: RangeMode,
) -> Result<ProxyCore> {
    let streams = input_streams(input)?;
    let mut core = ProxyCore::new(
        ctx,
        OutputKind::Audio,
        vec![
            ("min", params.min),
            ("max", params.max),
            ("mul", params.mul),
            ("add", params.add),
        ],
    );
    let args = core.broadcast(Some(streams.len()))?;
    for ch in 0..args.len() {
        let processor = RangeUnit {
            mode,
            min: args.f32("min", ch)?,
            max: args.f32("max", ch)?,
        };
        let inputs = streams.wrap(ch).into_iter().collect();
        core.push_channel(vec![unit(processor, inputs)])?;
    }
    Ok(core)
}

macro_rules! range_object {
    ($(#[$doc:meta])* $name:ident, $mode:expr, $min:expr, $max:expr) => {
        $(#[$doc])*
        pub struct $name {
            core: ProxyCore,
        }

        impl $name {
            pub fn new(ctx: &EngineContext, input: &dyn Source, params: RangeParams) -> Result<Self> {
                let core = range_core(ctx, input, params, $mode)?;
                Ok(Self { core })
            }

            /// Object with its usual bounds.
            pub fn with_defaults(ctx: &EngineContext, input: &dyn Source) -> Result<Self> {
                Self::new(ctx, input, RangeParams::new($min, $max))
            }

            pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
                self.core.set_input(0, input, fadetime)
            }

            setters! {
                set_min => "min",
                set_max => "max",
                set_mul => "mul",
                set_add => "add",
            }
        }

        impl_proxy!($name);
    };
}

range_object!(
    /// Hard limit to `[min, max]`.
    Clip, RangeMode::Clip, -1.0, 1.0
);
range_object!(
    /// Reflect excursions back into `[min, max]`.
    Mirror, RangeMode::Mirror, 0.0, 1.0
);
range_object!(
    /// Wrap excursions around into `[min, max)`.
    Wrap, RangeMode::Wrap, 0.0, 1.0
);

// ---------------------------------------------------------------------------

struct DegradeUnit {
    kernel: DegradeKernel,
    bitdepth: f32,
    srscale: f32,
}

impl Processor for DegradeUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        self.kernel
            .render(inputs.get(0), out, self.bitdepth, self.srscale);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "bitdepth" => self.bitdepth = value.expect_f32(name)?,
            "srscale" => self.srscale = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DegradeParams {
    /// Bits kept, 1..32
    pub bitdepth: Arg,
    /// Sample rate factor, 1/1024..1
    pub srscale: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for DegradeParams {
    fn default() -> Self {
        Self {
            bitdepth: Arg::from(16.0),
            srscale: Arg::from(1.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Signal quality reducer.
pub struct Degrade {
    core: ProxyCore,
}

impl Degrade {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: DegradeParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("bitdepth", params.bitdepth),
                ("srscale", params.srscale),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let processor = DegradeUnit {
                kernel: DegradeKernel::new(),
                bitdepth: args.f32("bitdepth", ch)?,
                srscale: args.f32("srscale", ch)?,
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
        set_bitdepth => "bitdepth",
        set_srscale => "srscale",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Degrade);

// ---------------------------------------------------------------------------

struct DistoUnit {
    kernel: DistoKernel,
    drive: f32,
    slope: f32,
}

impl Processor for DistoUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        self.kernel.render(inputs.get(0), out, self.drive, self.slope);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "drive" => self.drive = value.expect_f32(name)?,
            "slope" => self.slope = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistoParams {
    /// Amount of distortion, 0..1
    pub drive: Arg,
    /// Lowpass slope after the shaper, 0..1
    pub slope: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for DistoParams {
    fn default() -> Self {
        Self {
            drive: Arg::from(0.75),
            slope: Arg::from(0.5),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Arctangent distortion.
pub struct Disto {
    core: ProxyCore,
}

impl Disto {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: DistoParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("drive", params.drive),
                ("slope", params.slope),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let processor = DistoUnit {
                kernel: DistoKernel::new(),
                drive: args.f32("drive", ch)?,
                slope: args.f32("slope", ch)?,
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
        set_drive => "drive",
        set_slope => "slope",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Disto);

// ---------------------------------------------------------------------------

struct CompressUnit {
    kernel: Compressor,
    settings: CompressorSettings,
}

impl Processor for CompressUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.kernel
            .render(inputs.get(0), out, &self.settings, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let s = &mut self.settings;
        match name {
            "thresh" => s.thresh = value.expect_f32(name)?,
            "ratio" => s.ratio = value.expect_f32(name)?,
            "risetime" => s.risetime = value.expect_f32(name)?,
            "falltime" => s.falltime = value.expect_f32(name)?,
            "lookahead" => s.lookahead = value.expect_f32(name)?,
            "knee" => s.knee = value.expect_f32(name)?,
            "output_amp" => s.output_amp = value.expect_bool(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    fn on_stop(&mut self) {
        self.kernel.reset();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressParams {
    /// dBFS
    pub thresh: Arg,
    pub ratio: Arg,
    /// Seconds
    pub risetime: Arg,
    /// Seconds
    pub falltime: Arg,
    /// Milliseconds, 0..25
    pub lookahead: Arg,
    /// 0 hard, 1 soft
    pub knee: Arg,
    /// Output the gain curve instead of the compressed signal
    pub output_amp: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for CompressParams {
    fn default() -> Self {
        let d = CompressorSettings::default();
        Self {
            thresh: Arg::from(d.thresh),
            ratio: Arg::from(d.ratio),
            risetime: Arg::from(d.risetime),
            falltime: Arg::from(d.falltime),
            lookahead: Arg::from(d.lookahead),
            knee: Arg::from(d.knee),
            output_amp: Arg::from(d.output_amp),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Reduces the dynamic range of its input.
pub struct Compress {
    core: ProxyCore,
}

impl Compress {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: CompressParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("thresh", params.thresh),
                ("ratio", params.ratio),
                ("risetime", params.risetime),
                ("falltime", params.falltime),
                ("lookahead", params.lookahead),
                ("knee", params.knee),
                ("output_amp", params.output_amp),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let sample_rate = ctx.config().sample_rate;
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let settings = CompressorSettings {
                thresh: args.f32("thresh", ch)?,
                ratio: args.f32("ratio", ch)?,
                risetime: args.f32("risetime", ch)?,
                falltime: args.f32("falltime", ch)?,
                lookahead: args.f32("lookahead", ch)?,
                knee: args.f32("knee", ch)?,
                output_amp: args.bool("output_amp", ch)?,
            };
            let processor = CompressUnit {
                kernel: Compressor::new(sample_rate),
                settings,
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
        set_thresh => "thresh",
        set_ratio => "ratio",
        set_risetime => "risetime",
        set_falltime => "falltime",
        set_lookahead => "lookahead",
        set_knee => "knee",
        set_output_amp => "output_amp",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Compress);

struct GateUnit {
    kernel: GateKernel,
    settings: GateSettings,
}

impl Processor for GateUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        self.kernel
            .render(inputs.get(0), out, &self.settings, ctx.sample_rate);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let s = &mut self.settings;
        match name {
            "thresh" => s.thresh = value.expect_f32(name)?,
            "risetime" => s.risetime = value.expect_f32(name)?,
            "falltime" => s.falltime = value.expect_f32(name)?,
            "lookahead" => s.lookahead = value.expect_f32(name)?,
            "output_amp" => s.output_amp = value.expect_bool(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    fn on_stop(&mut self) {
        self.kernel.reset();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateParams {
    /// dBFS
    pub thresh: Arg,
    /// Seconds
    pub risetime: Arg,
    /// Seconds
    pub falltime: Arg,
    /// Milliseconds, 0..25
    pub lookahead: Arg,
    /// Output the gate envelope instead of the gated signal
    pub output_amp: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for GateParams {
    fn default() -> Self {
        let d = GateSettings::default();
        Self {
            thresh: Arg::from(d.thresh),
            risetime: Arg::from(d.risetime),
            falltime: Arg::from(d.falltime),
            lookahead: Arg::from(d.lookahead),
            output_amp: Arg::from(d.output_amp),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Noise gate.
pub struct Gate {
    core: ProxyCore,
}

impl Gate {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: GateParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("thresh", params.thresh),
                ("risetime", params.risetime),
                ("falltime", params.falltime),
                ("lookahead", params.lookahead),
                ("output_amp", params.output_amp),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let sample_rate = ctx.config().sample_rate;
        let args = core.broadcast(Some(streams.len()))?;
        for ch in 0..args.len() {
            let settings = GateSettings {
                thresh: args.f32("thresh", ch)?,
                risetime: args.f32("risetime", ch)?,
                falltime: args.f32("falltime", ch)?,
                lookahead: args.f32("lookahead", ch)?,
                output_amp: args.bool("output_amp", ch)?,
            };
            let processor = GateUnit {
                kernel: GateKernel::new(sample_rate),
                settings,
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
        set_thresh => "thresh",
        set_risetime => "risetime",
        set_falltime => "falltime",
        set_lookahead => "lookahead",
        set_output_amp => "output_amp",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Gate);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::testing::{ctx, run};
    use crate::objects::{Proxy, Sine, SineParams};

    fn dc(ctx: &EngineContext, level: f64) -> Sine {
        // a sine frozen at its peak is a constant
        Sine::new(ctx, SineParams {
            freq: Arg::from(0.0),
            phase: Arg::from(0.25),
            mul: Arg::from(level),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn clip_mirror_wrap_fold_a_constant() {
        let ctx = ctx();
        let src = dc(&ctx, 1.25);
        let clip = Clip::new(&ctx, &src, RangeParams::new(0.0, 1.0)).unwrap();
        let mirror = Mirror::with_defaults(&ctx, &src).unwrap();
        let wrap = Wrap::with_defaults(&ctx, &src).unwrap();

        run(&ctx, 1);
        assert!((clip.core().values().unwrap()[0] - 1.0).abs() < 1e-5);
        assert!((mirror.core().values().unwrap()[0] - 0.75).abs() < 1e-5);
        assert!((wrap.core().values().unwrap()[0] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn range_bounds_are_settable() {
        let ctx = ctx();
        let src = dc(&ctx, 0.8);
        let mut clip = Clip::with_defaults(&ctx, &src).unwrap();
        clip.set_max(0.5).unwrap();
        run(&ctx, 1);
        assert!((clip.core().values().unwrap()[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn degrade_quantizes() {
        let ctx = ctx();
        let src = dc(&ctx, 0.3);
        let degrade = Degrade::new(&ctx, &src, DegradeParams {
            bitdepth: Arg::from(2.0),
            ..Default::default()
        })
        .unwrap();
        run(&ctx, 1);
        // two bits: steps of 0.5
        assert!((degrade.core().values().unwrap()[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn disto_saturates() {
        let ctx = ctx();
        let src = dc(&ctx, 1.0);
        let disto = Disto::new(&ctx, &src, DistoParams {
            drive: Arg::from(1.0),
            slope: Arg::from(0.0),
            ..Default::default()
        })
        .unwrap();
        run(&ctx, 1);
        let value = disto.core().values().unwrap()[0];
        assert!(value > 1.5 && value < std::f32::consts::FRAC_PI_2 + 1e-3, "got {value}");
    }

    #[test]
    fn compress_reduces_loud_input() {
        let ctx = ctx();
        // -6 dBFS, 14 dB over the threshold
        let src = dc(&ctx, 0.5012);
        let comp = Compress::new(&ctx, &src, CompressParams {
            risetime: Arg::from(0.001),
            output_amp: Arg::from(true),
            ..Default::default()
        })
        .unwrap();
        let quiet_src = dc(&ctx, 0.01);
        let quiet = Compress::new(&ctx, &quiet_src, CompressParams::default()).unwrap();

        run(&ctx, 20);
        let gain_db = 20.0 * comp.core().values().unwrap()[0].log10();
        assert!((gain_db + 7.0).abs() < 0.1, "gain {gain_db} dB");
        assert!((quiet.core().values().unwrap()[0] - 0.01).abs() < 1e-5);
    }

    #[test]
    fn gate_silences_below_threshold() {
        let ctx = ctx();
        let src = dc(&ctx, 0.001);
        let mut gate = Gate::new(&ctx, &src, GateParams {
            thresh: Arg::from(-40.0),
            lookahead: Arg::from(0.0),
            ..Default::default()
        })
        .unwrap();

        run(&ctx, 50);
        assert!(gate.core().values().unwrap()[0].abs() < 1e-6);

        // the follower tracks power, so 1e-6 needs a threshold under -120 dB
        gate.set_thresh(-130.0).unwrap();
        run(&ctx, 50);
        assert!((gate.core().values().unwrap()[0] - 0.001).abs() < 1e-5);
        assert!(gate.set_output_amp("yes").is_err());
    }
}
