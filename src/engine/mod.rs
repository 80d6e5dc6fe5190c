//! The processing engine behind every proxy object.
//!
//! Units live in a slot table and are rendered in slot order once per block.
//! Each unit reads the outputs of its inputs, writes one mono block, gets the
//! engine's `mul`/`add` post-processing, and is optionally summed into one of
//! the interleaved output channels.

pub mod fader;
pub mod handle;
pub mod unit;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

pub use fader::InputFader;
pub use handle::Handle;
pub use unit::{Inputs, ProcessCtx, Processor, UnitId};

use crate::{broadcast::Value, command::ControlBus, EngineConfig, Error, Result};
use unit::SILENCE;

/*
Scheduling
==========

Every unit carries a tiny state machine, evaluated at block boundaries:

               play(dur, delay)
  Stopped ─────────────────────→ Pending { start_at, stop_at }
     ↑                                 │ elapsed >= start_at
     │ stop() or elapsed >= stop_at    ↓
     └──────────────────────────── Playing { stop_at }

`start_at`/`stop_at` are absolute sample counts. A duration of 0 means
"until stopped". Stopped units are not processed and output silence.

`play` only makes a unit compute. `out` additionally routes it to an output
channel; `play` and `stop` clear that route.


Ordering
========

Units are processed in slot order. A unit whose input sits in a later slot
reads that input's previous block (one block of latency). Fresh units take
the next slot, so a normal patch built source-first renders without delay.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlayState {
    Stopped,
    Pending { start_at: u64, stop_at: Option<u64> },
    Playing { stop_at: Option<u64> },
}

struct Slot {
    generation: u32,
    processor: Box<dyn Processor>,
    inputs: Vec<InputFader>,
    input_buffers: Vec<Vec<f32>>,
    output: Vec<f32>,
    mul: f32,
    add: f32,
    state: PlayState,
    route: Option<usize>,
}

impl Slot {
    fn advance(&mut self, now: u64) {
        if let PlayState::Pending { start_at, stop_at } = self.state {
            if start_at <= now {
                self.state = PlayState::Playing { stop_at };
                self.processor.on_play();
            }
        }
        if let PlayState::Playing {
            stop_at: Some(stop_at),
        } = self.state
        {
            if stop_at <= now {
                self.state = PlayState::Stopped;
                self.route = None;
                self.processor.on_stop();
            }
        }
    }

    fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Playing { .. })
    }
}

pub struct Engine {
    config: EngineConfig,
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    free: Vec<u32>,
    elapsed: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            slots: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            elapsed: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Insert a unit reading from `inputs`, in order.
    ///
    /// Every input must be a live unit.
    pub fn add(&mut self, processor: Box<dyn Processor>, inputs: &[UnitId]) -> Result<UnitId> {
        for input in inputs {
            self.slot(*input)?;
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                (self.slots.len() - 1) as u32
            }
        };
        let generation = self.generations[index as usize];
        let block_size = self.config.block_size;

        let state = if processor.autostart() {
            PlayState::Pending {
                start_at: self.elapsed,
                stop_at: None,
            }
        } else {
            PlayState::Stopped
        };

        self.slots[index as usize] = Some(Slot {
            generation,
            processor,
            inputs: inputs.iter().copied().map(InputFader::new).collect(),
            input_buffers: vec![vec![0.0; block_size]; inputs.len()],
            output: vec![0.0; block_size],
            mul: 1.0,
            add: 0.0,
            state,
            route: None,
        });

        let id = UnitId { index, generation };
        debug!(unit = %id, inputs = inputs.len(), "unit added");
        Ok(id)
    }

    /// Remove a unit. Units still reading from it get silence.
    pub fn release(&mut self, id: UnitId) -> Result<()> {
        self.slot(id)?;
        let index = id.index as usize;
        self.slots[index] = None;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(id.index);
        trace!(unit = %id, "unit released");
        Ok(())
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.slot(id).is_ok()
    }

    fn slot(&self, id: UnitId) -> Result<&Slot> {
        self.slots
            .get(id.index as usize)
            .and_then(Option::as_ref)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(Error::UnknownUnit(id))
    }

    fn slot_mut(&mut self, id: UnitId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .and_then(Option::as_mut)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(Error::UnknownUnit(id))
    }

    /// Forward a parameter. `mul` and `add` are handled here for every unit.
    pub fn set_param(&mut self, id: UnitId, name: &str, value: &Value) -> Result<()> {
        let slot = self.slot_mut(id)?;
        match name {
            "mul" => slot.mul = value.expect_f32(name)?,
            "add" => slot.add = value.expect_f32(name)?,
            _ => slot.processor.set_param(name, value)?,
        }
        Ok(())
    }

    /// Swap input `k` for `source`, crossfading over `fadetime` seconds.
    pub fn set_input(&mut self, id: UnitId, k: usize, source: UnitId, fadetime: f32) -> Result<()> {
        self.slot(source)?;
        let fade_samples = self.config.to_samples(fadetime).min(u32::MAX as u64) as u32;
        let slot = self.slot_mut(id)?;
        let len = slot.inputs.len();
        let fader = slot
            .inputs
            .get_mut(k)
            .ok_or(Error::IndexOutOfRange { index: k, len })?;
        fader.replace(source, fade_samples);
        Ok(())
    }

    /// Start computing after `delay` seconds, for `dur` seconds (0 = forever).
    pub fn play(&mut self, id: UnitId, dur: f32, delay: f32) -> Result<()> {
        let start_at = self.elapsed + self.config.to_samples(delay);
        let stop_at = (dur > 0.0).then(|| start_at + self.config.to_samples(dur));
        let slot = self.slot_mut(id)?;
        slot.state = PlayState::Pending { start_at, stop_at };
        slot.route = None;
        Ok(())
    }

    /// Like [`Engine::play`], also summing the unit into `chnl % nchnls`.
    pub fn out(&mut self, id: UnitId, chnl: usize, dur: f32, delay: f32) -> Result<()> {
        let channel = chnl % self.config.nchnls;
        self.play(id, dur, delay)?;
        self.slot_mut(id)?.route = Some(channel);
        Ok(())
    }

    pub fn stop(&mut self, id: UnitId) -> Result<()> {
        let slot = self.slot_mut(id)?;
        if slot.state != PlayState::Stopped {
            slot.state = PlayState::Stopped;
            slot.processor.on_stop();
        }
        slot.route = None;
        Ok(())
    }

    pub fn is_playing(&self, id: UnitId) -> Result<bool> {
        Ok(self.slot(id)?.is_playing())
    }

    /// Output channel the unit is summed into, if any.
    pub fn route(&self, id: UnitId) -> Result<Option<usize>> {
        Ok(self.slot(id)?.route)
    }

    /// Last rendered block of a unit, after `mul`/`add`.
    pub fn output(&self, id: UnitId) -> Result<&[f32]> {
        Ok(&self.slot(id)?.output)
    }

    /// First sample of the unit's last block.
    pub fn value(&self, id: UnitId) -> Result<f32> {
        Ok(self.slot(id)?.output[0])
    }

    pub fn unit_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn elapsed_samples(&self) -> u64 {
        self.elapsed
    }

    /// Render interleaved `nchnls` audio into `out`, in chunks of at most
    /// `block_size` frames. A trailing partial frame is left silent.
    pub fn process(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let nchnls = self.config.nchnls;
        for chunk in out.chunks_mut(self.config.block_size * nchnls) {
            let frames = chunk.len() / nchnls;
            if frames == 0 {
                break;
            }
            self.render_block(frames, chunk);
        }
    }

    fn source(&self, id: UnitId, frames: usize) -> &[f32] {
        match self.slot(id) {
            Ok(slot) => &slot.output[..frames],
            Err(_) => &SILENCE[..frames],
        }
    }

    fn render_block(&mut self, frames: usize, out: &mut [f32]) {
        let now = self.elapsed;
        let nchnls = self.config.nchnls;
        let ctx = ProcessCtx {
            sample_rate: self.config.sample_rate,
            elapsed: now,
            frames,
        };

        for index in 0..self.slots.len() {
            let Some(mut slot) = self.slots[index].take() else {
                continue;
            };

            slot.advance(now);

            if slot.is_playing() {
                for (fader, buffer) in slot.inputs.iter_mut().zip(slot.input_buffers.iter_mut()) {
                    let new = self.source(fader.current(), frames);
                    let old = match fader.previous() {
                        Some(previous) => self.source(previous, frames),
                        None => &SILENCE[..frames],
                    };
                    fader.render(new, old, &mut buffer[..frames]);
                }

                let inputs = Inputs::new(&slot.input_buffers, frames);
                let output = &mut slot.output[..frames];
                slot.processor.process(&inputs, output, &ctx);

                if slot.mul != 1.0 || slot.add != 0.0 {
                    for sample in output.iter_mut() {
                        *sample = *sample * slot.mul + slot.add;
                    }
                }

                if let Some(channel) = slot.route {
                    for (frame, sample) in output.iter().enumerate() {
                        out[frame * nchnls + channel] += *sample;
                    }
                }

                if slot.processor.finished() {
                    trace!(index, "unit finished");
                    slot.state = PlayState::Stopped;
                    slot.route = None;
                    slot.processor.on_stop();
                }
            } else {
                slot.output[..frames].fill(0.0);
            }

            self.slots[index] = Some(slot);
        }

        self.elapsed += frames as u64;
    }
}

/// Shared handle to an engine, passed to every proxy constructor.
///
/// Cloning is cheap; all clones drive the same engine and control bus.
#[derive(Clone)]
pub struct EngineContext {
    engine: Arc<Mutex<Engine>>,
    config: EngineConfig,
    bus: ControlBus,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let engine = Engine::new(config)?;
        debug!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            nchnls = config.nchnls,
            "engine created"
        );
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            config,
            bus: ControlBus::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &ControlBus {
        &self.bus
    }

    /// Lock the engine. A panic on another thread does not poison it for us.
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a unit and wrap it in an owning [`Handle`].
    pub fn add_unit(&self, processor: Box<dyn Processor>, inputs: &[UnitId]) -> Result<Handle> {
        let id = self.lock().add(processor, inputs)?;
        Ok(Handle::new(id, self.clone()))
    }

    /// Render interleaved audio, see [`Engine::process`].
    pub fn process_block(&self, out: &mut [f32]) {
        self.lock().process(out);
    }

    pub fn value(&self, id: UnitId) -> Result<f32> {
        self.lock().value(id)
    }

    pub fn unit_count(&self) -> usize {
        self.lock().unit_count()
    }

    /// Seconds rendered so far.
    pub fn elapsed(&self) -> f64 {
        self.lock().elapsed_samples() as f64 / self.config.sample_rate as f64
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f32);

    impl Processor for Constant {
        fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
            out.fill(self.0);
        }

        fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
            match name {
                "value" => self.0 = value.expect_f32(name)?,
                _ => return Err(Error::UnknownParam(name.to_string())),
            }
            Ok(())
        }
    }

    struct Doubler;

    impl Processor for Doubler {
        fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
            for (o, i) in out.iter_mut().zip(inputs.get(0)) {
                *o = i * 2.0;
            }
        }
    }

    /// Plays one block, then reports itself finished.
    struct OneShot {
        blocks: usize,
    }

    impl Processor for OneShot {
        fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
            out.fill(1.0);
            self.blocks += 1;
        }

        fn finished(&self) -> bool {
            self.blocks >= 1
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default().sample_rate(1_000.0).block_size(10)).unwrap()
    }

    #[test]
    fn units_autostart_and_route_to_channel() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(0.5)), &[]).unwrap();
        engine.out(id, 1, 0.0, 0.0).unwrap();

        let mut out = vec![0.0; 20];
        engine.process(&mut out);

        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.5);
        assert_eq!(engine.value(id).unwrap(), 0.5);
    }

    #[test]
    fn out_channel_wraps_by_nchnls() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.out(id, 3, 0.0, 0.0).unwrap();
        assert_eq!(engine.route(id).unwrap(), Some(1));
    }

    #[test]
    fn mul_and_add_apply_after_processing() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.set_param(id, "mul", &Value::Float(0.5)).unwrap();
        engine.set_param(id, "add", &Value::Float(0.25)).unwrap();

        engine.process(&mut [0.0; 20]);
        assert!((engine.value(id).unwrap() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn inputs_read_upstream_output() {
        let mut engine = engine();
        let src = engine.add(Box::new(Constant(0.25)), &[]).unwrap();
        let dbl = engine.add(Box::new(Doubler), &[src]).unwrap();

        engine.process(&mut [0.0; 20]);
        assert_eq!(engine.value(dbl).unwrap(), 0.5);
    }

    #[test]
    fn stopped_units_output_silence() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.stop(id).unwrap();

        engine.process(&mut [0.0; 20]);
        assert_eq!(engine.value(id).unwrap(), 0.0);
        assert!(!engine.is_playing(id).unwrap());
    }

    #[test]
    fn finished_units_stop_themselves() {
        let mut engine = engine();
        let id = engine.add(Box::new(OneShot { blocks: 0 }), &[]).unwrap();
        engine.out(id, 0, 0.0, 0.0).unwrap();

        let mut block = [0.0; 20];
        engine.process(&mut block);
        assert_eq!(block[0], 1.0, "the last block still plays");
        assert!(!engine.is_playing(id).unwrap());
        assert_eq!(engine.route(id).unwrap(), None);

        engine.process(&mut block);
        assert_eq!(block[0], 0.0);
    }

    #[test]
    fn delay_and_duration_are_block_granular() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.play(id, 0.02, 0.01).unwrap();

        let mut block = [0.0; 20];
        engine.process(&mut block);
        assert_eq!(engine.value(id).unwrap(), 0.0, "still waiting for delay");

        engine.process(&mut block);
        assert_eq!(engine.value(id).unwrap(), 1.0);
        engine.process(&mut block);
        assert_eq!(engine.value(id).unwrap(), 1.0);

        engine.process(&mut block);
        assert_eq!(engine.value(id).unwrap(), 0.0, "duration elapsed");
    }

    #[test]
    fn released_ids_are_rejected() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.release(id).unwrap();

        assert!(matches!(engine.value(id), Err(Error::UnknownUnit(_))));

        let reused = engine.add(Box::new(Constant(2.0)), &[]).unwrap();
        assert_eq!(reused.index, id.index);
        assert!(!engine.contains(id));
        assert!(engine.contains(reused));
    }

    #[test]
    fn add_rejects_dead_inputs() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.release(id).unwrap();

        assert!(engine.add(Box::new(Doubler), &[id]).is_err());
    }

    #[test]
    fn set_input_checks_index() {
        let mut engine = engine();
        let a = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        let b = engine.add(Box::new(Doubler), &[a]).unwrap();

        assert!(matches!(
            engine.set_input(b, 1, a, 0.0),
            Err(Error::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn unknown_param_is_reported() {
        let mut engine = engine();
        let id = engine.add(Box::new(Doubler), &[]).unwrap();
        assert!(matches!(
            engine.set_param(id, "freq", &Value::Float(1.0)),
            Err(Error::UnknownParam(_))
        ));
    }

    #[test]
    fn long_buffers_are_chunked() {
        let mut engine = engine();
        let id = engine.add(Box::new(Constant(1.0)), &[]).unwrap();
        engine.out(id, 0, 0.0, 0.0).unwrap();

        let mut out = vec![0.0; 2 * 25];
        engine.process(&mut out);

        assert_eq!(engine.elapsed_samples(), 25);
        assert!(out.iter().step_by(2).all(|&s| s == 1.0));
    }
}
