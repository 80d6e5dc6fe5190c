//! Audio setup and the demo patch.

use std::sync::{Arc, Mutex};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use tracing::{error, info};

use fanout_dsp::{
    command::Router,
    objects::{Fm, FmParams, Pan, PanParams, ProxyExt, Svf, SvfParams},
    Arg, EngineContext, MAX_BLOCK_SIZE,
};

use crate::config::{AppConfig, PatchConfig};
use crate::ui::{Slider, UiApp};

/// Samples buffered for the scope and spectrum
const VIS_RING: usize = 8_192;

pub struct App {
    config: AppConfig,
}

/// FM → SVF → Pan, each object reachable through the router.
struct Patch {
    fm: Arc<Mutex<Fm>>,
    svf: Arc<Mutex<Svf>>,
    pan: Arc<Mutex<Pan>>,
}

impl Patch {
    fn build(ctx: &EngineContext, config: &PatchConfig) -> fanout_dsp::Result<Self> {
        let fm = Fm::new(ctx, FmParams {
            carrier: Arg::from(config.carrier),
            ratio: Arg::from(config.ratio),
            index: Arg::from(config.index),
            mul: Arg::from(config.level),
            ..Default::default()
        })?;
        let svf = Svf::new(ctx, &fm, SvfParams {
            freq: Arg::from(config.cutoff),
            q: Arg::from(config.q),
            ..Default::default()
        })?;
        let mut pan = Pan::new(ctx, &svf, PanParams {
            pan: Arg::from(config.pan),
            ..Default::default()
        })?;
        pan.out()?;

        Ok(Self {
            fm: Arc::new(Mutex::new(fm)),
            svf: Arc::new(Mutex::new(svf)),
            pan: Arc::new(Mutex::new(pan)),
        })
    }

    fn bind(&self, router: &mut Router) {
        router.bind("fm", Arc::clone(&self.fm));
        router.bind("svf", Arc::clone(&self.svf));
        router.bind("pan", Arc::clone(&self.pan));
    }

    fn sliders(config: &PatchConfig) -> Vec<Slider> {
        vec![
            Slider::new("carrier", "/fm/carrier", 40.0, 1_000.0, config.carrier),
            Slider::new("ratio", "/fm/ratio", 0.125, 4.0, config.ratio),
            Slider::new("index", "/fm/index", 0.0, 20.0, config.index),
            Slider::new("level", "/fm/mul", 0.0, 0.5, config.level),
            Slider::new("cutoff", "/svf/freq", 50.0, 8_000.0, config.cutoff),
            Slider::new("q", "/svf/q", 0.5, 20.0, config.q),
            Slider::new("pan", "/pan/pan", 0.0, 1.0, config.pan),
        ]
    }
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let supported = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = supported.sample_rate().0 as f32;
        let device_channels = supported.channels() as usize;
        let engine_config = self.config.engine.sample_rate(sample_rate);
        let ctx = EngineContext::new(engine_config)?;
        info!(sample_rate, device_channels, nchnls = engine_config.nchnls, "audio device ready");

        let patch = Patch::build(&ctx, &self.config.patch)?;
        let mut router = Router::new(self.config.port);
        patch.bind(&mut router);
        let _listener = router.listen(ctx.bus());

        let (mut audio_tx, audio_rx) = RingBuffer::<f32>::new(VIS_RING);
        let nchnls = engine_config.nchnls;
        let mut scratch = vec![0.0f32; MAX_BLOCK_SIZE * nchnls];
        let engine = ctx.clone();

        let stream = device
            .build_output_stream(
                &supported.into(),
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / device_channels;
                    let mut frames_written = 0;
                    while frames_written < total_frames {
                        let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut scratch[..frames * nchnls];
                        engine.process_block(block);

                        // engine channels wrap over the device channels
                        let out_off = frames_written * device_channels;
                        for i in 0..frames {
                            for ch in 0..device_channels {
                                data[out_off + i * device_channels + ch] = block[i * nchnls + ch % nchnls];
                            }
                            // scope shows channel 0, samples are dropped while the UI lags
                            let _ = audio_tx.push(block[i * nchnls]);
                        }
                        frames_written += frames;
                    }
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .wrap_err("failed to build output stream")?;
        stream.play().wrap_err("failed to start output stream")?;

        let mut ui = UiApp::new(
            audio_rx,
            ctx.bus().clone(),
            self.config.port,
            Patch::sliders(&self.config.patch),
            sample_rate,
        );
        let mut terminal = ratatui::init();
        let result = ui.run(&mut terminal);
        ratatui::restore();

        drop(stream);
        info!(elapsed = ctx.elapsed(), "stopped");
        result
    }
}
