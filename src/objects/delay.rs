use super::{impl_proxy, input_streams, setters, unit, OutputKind, ProxyCore, Source};
use crate::{
    broadcast::{Arg, Value},
    dsp::delay::DelayLine,
    engine::{Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

struct DelayUnit {
    line: DelayLine,
    delay: f32,
    feedback: f32,
}

impl Processor for DelayUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        let delay_samples = self.delay * ctx.sample_rate;
        self.line
            .render(inputs.get(0), out, delay_samples, self.feedback);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "delay" => self.delay = value.expect_f32(name)?.max(0.0),
            "feedback" => self.feedback = value.expect_f32(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayParams {
    /// Delay time in seconds
    pub delay: Arg,
    /// Amount of output fed back into the line, 0..1
    pub feedback: Arg,
    /// Longest delay in seconds, fixed at creation
    pub maxdelay: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            delay: Arg::from(0.25),
            feedback: Arg::from(0.0),
            maxdelay: Arg::from(1.0),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Sweepable recursive delay.
pub struct Delay {
    core: ProxyCore,
    maxdelay: Arg,
}

impl Delay {
    pub fn new(ctx: &EngineContext, input: &dyn Source, params: DelayParams) -> Result<Self> {
        let streams = input_streams(input)?;
        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![
                ("delay", params.delay),
                ("feedback", params.feedback),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let maxdelay = params.maxdelay;
        // maxdelay is fixed at creation but still takes part in channel expansion
        let hint = streams.len().max(maxdelay.seq_len().unwrap_or(0));
        let args = core.broadcast(Some(hint))?;

        for ch in 0..args.len() {
            let max_seconds = maxdelay.wrap_named("maxdelay", ch)?.expect_f32("maxdelay")?;
            let max_samples = ctx.config().to_samples(max_seconds) as usize;
            let processor = DelayUnit {
                line: DelayLine::new(max_samples),
                delay: args.f32("delay", ch)?.max(0.0),
                feedback: args.f32("feedback", ch)?,
            };
            let inputs = streams.wrap(ch).into_iter().collect();
            core.push_channel(vec![unit(processor, inputs)])?;
        }
        Ok(Self { core, maxdelay })
    }

    pub fn maxdelay(&self) -> &Arg {
        &self.maxdelay
    }

    pub fn set_input(&mut self, input: &dyn Source, fadetime: f32) -> Result<()> {
        self.core.set_input(0, input, fadetime)
    }

    setters! {
        set_delay => "delay",
        set_feedback => "feedback",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(Delay);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::UnitId;
    use crate::objects::testing::{ctx, run, BLOCK};
    use crate::objects::{Proxy, Streams};

    /// Outputs 1.0 on its very first sample only.
    struct Impulse(bool);

    impl Processor for Impulse {
        fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
            out.fill(0.0);
            if !self.0 {
                out[0] = 1.0;
                self.0 = true;
            }
        }
    }

    fn impulse(ctx: &EngineContext) -> (crate::engine::Handle, Streams) {
        let handle = ctx.add_unit(Box::new(Impulse(false)), &[]).unwrap();
        let streams = Streams::new(vec![handle.id()]);
        (handle, streams)
    }

    fn collect(ctx: &EngineContext, id: UnitId, blocks: usize) -> Vec<f32> {
        let mut samples = Vec::new();
        for _ in 0..blocks {
            run(ctx, 1);
            samples.extend_from_slice(ctx.lock().output(id).unwrap());
        }
        samples
    }

    #[test]
    fn impulse_comes_back_after_delay() {
        let ctx = ctx();
        let (_src, streams) = impulse(&ctx);
        let delay = Delay::new(&ctx, &streams, DelayParams {
            delay: Arg::from(0.015),
            ..Default::default()
        })
        .unwrap();

        let samples = collect(&ctx, delay.core().handle(0).unwrap().id(), 3);
        assert_eq!(samples.len(), 3 * BLOCK);
        assert!((samples[15] - 1.0).abs() < 1e-6);
        assert_eq!(samples.iter().filter(|s| s.abs() > 1e-6).count(), 1);
    }

    #[test]
    fn feedback_repeats() {
        let ctx = ctx();
        let (_src, streams) = impulse(&ctx);
        let delay = Delay::new(&ctx, &streams, DelayParams {
            delay: Arg::from(0.01),
            feedback: Arg::from(0.5),
            ..Default::default()
        })
        .unwrap();

        let samples = collect(&ctx, delay.core().handle(0).unwrap().id(), 4);
        assert!((samples[10] - 1.0).abs() < 1e-6);
        assert!((samples[20] - 0.5).abs() < 1e-6);
        assert!((samples[30] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn maxdelay_list_sets_channels() {
        let ctx = ctx();
        let (_src, streams) = impulse(&ctx);
        let delay = Delay::new(&ctx, &streams, DelayParams {
            maxdelay: vec![0.5, 1.0].into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(delay.core().channels(), 2);
        assert_eq!(delay.maxdelay(), &Arg::from(vec![0.5, 1.0]));
    }
}
