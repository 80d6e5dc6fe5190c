use std::fmt;

use crate::{broadcast::Value, Error, Result, MAX_BLOCK_SIZE};

pub(crate) static SILENCE: [f32; MAX_BLOCK_SIZE] = [0.0; MAX_BLOCK_SIZE];

/// Generational index of a unit in the engine's slot table.
///
/// A released slot bumps its generation, so stale ids are rejected instead of
/// silently addressing whatever unit reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Context passed to units during processing
///
/// - sample_rate: engine sample rate
/// - elapsed: samples rendered before this block started
/// - frames: frames in this block
pub struct ProcessCtx {
    pub sample_rate: f32,
    pub elapsed: u64,
    pub frames: usize,
}

impl ProcessCtx {
    /// Engine time at the start of this block, in seconds.
    pub fn time(&self) -> f64 {
        self.elapsed as f64 / self.sample_rate as f64
    }
}

/// Input buffers of one unit for the current block.
///
/// Missing inputs read as silence.
pub struct Inputs<'a> {
    buffers: &'a [Vec<f32>],
    frames: usize,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(buffers: &'a [Vec<f32>], frames: usize) -> Self {
        Self { buffers, frames }
    }

    pub fn get(&self, k: usize) -> &[f32] {
        match self.buffers.get(k) {
            Some(buffer) => &buffer[..self.frames],
            None => &SILENCE[..self.frames],
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Core trait for engine-owned processing units
///
/// `process` runs on the audio thread and must not allocate or block.
/// Everything else is called from the control thread with the engine locked.
pub trait Processor: Send {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx);

    fn set_param(&mut self, name: &str, _value: &Value) -> Result<()> {
        Err(Error::UnknownParam(name.to_string()))
    }

    /// Whether the unit starts playing as soon as it is added.
    fn autostart(&self) -> bool {
        true
    }

    fn on_play(&mut self) {}

    fn on_stop(&mut self) {}

    /// Whether the unit has played to its end. The engine stops it after
    /// the current block.
    fn finished(&self) -> bool {
        false
    }
}
