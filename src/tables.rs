//! Function tables: generated waveforms, breakpoint curves, sound files.
//!
//! Every table owns one or more [`SharedTable`] streams (one per channel).
//! Streams are shared with the engine units reading them, so `replace` and
//! `set_size` take effect on the next block without rebuilding the readers.

use std::f32::consts::{PI, TAU};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, TryLockError};

use tracing::debug;

use crate::{Error, Result};

pub const DEFAULT_SIZE: usize = 8192;

/*
Guard Point
===========

Stored tables are one sample longer than their nominal size:

  index:  0   1   2  ...  size-1 | size
  value:  a   b   c  ...    z    |  a      ← copy of the first sample

A reader interpolating between `i` and `i + 1` never has to wrap by hand.
*/

/// One table stream, shared between the control side and engine units.
#[derive(Debug, Clone)]
pub struct SharedTable {
    data: Arc<RwLock<Vec<f32>>>,
}

impl SharedTable {
    /// Wrap `samples` (nominal size), appending the guard point.
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            data: Arc::new(RwLock::new(with_guard(samples))),
        }
    }

    /// Read access including the guard point.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Non-blocking read for the audio thread; `None` while a replace is in
    /// progress.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Vec<f32>>> {
        match self.data.try_read() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Nominal size (without the guard point).
    pub fn size(&self) -> usize {
        self.read().len().saturating_sub(1)
    }

    pub fn replace(&self, samples: Vec<f32>) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        *data = with_guard(samples);
    }

    /// Copy of the nominal samples.
    pub fn to_vec(&self) -> Vec<f32> {
        let data = self.read();
        data[..data.len().saturating_sub(1)].to_vec()
    }
}

fn with_guard(mut samples: Vec<f32>) -> Vec<f32> {
    let first = samples.first().copied().unwrap_or(0.0);
    samples.push(first);
    samples
}

fn check_size(size: usize) -> Result<usize> {
    if size == 0 {
        Err(Error::InvalidFormat("table size must be positive".into()))
    } else {
        Ok(size)
    }
}

/// Anything that can feed table readers such as `Osc`.
pub trait Table {
    fn streams(&self) -> &[SharedTable];

    fn size(&self) -> usize {
        self.streams().first().map(SharedTable::size).unwrap_or(0)
    }
}

/// Sum of harmonically related sines, `list[k]` is the amplitude of harmonic k+1.
pub fn harmonics(list: &[f32], size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = TAU * i as f32 / size as f32;
            list.iter()
                .enumerate()
                .map(|(k, amp)| amp * ((k + 1) as f32 * phase).sin())
                .sum()
        })
        .collect()
}

/// Sum of Chebyshev polynomials over x in [-1, 1], `list[k]` weighs T(k+1).
pub fn chebyshev(list: &[f32], size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32 * 2.0 - 1.0;
            let (mut prev, mut cur) = (1.0f32, x);
            let mut sum = 0.0;
            for amp in list {
                sum += amp * cur;
                let next = 2.0 * x * cur - prev;
                prev = cur;
                cur = next;
            }
            sum
        })
        .collect()
}

/// Raised-cosine window.
pub fn hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (TAU * i as f32 / size as f32).cos())
        .collect()
}

/// How a breakpoint table joins consecutive points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Linear,
    Cosine,
    /// Hermite curve; `tension` 1 tightens, -1 loosens, `bias` pulls the
    /// curve towards the first (positive) or second (negative) point.
    Curve { tension: f32, bias: f32 },
    /// `y0 + (y1 - y0) * t^exp`. With `inverse`, falling segments use the
    /// mirrored curve so up and down slopes look alike.
    Exp { exp: f32, inverse: bool },
}

impl Segment {
    /// Value between `y1` and `y2` at `t` in [0, 1). `y0` and `y3` are the
    /// neighbouring points, used by curves only.
    fn interpolate(self, [y0, y1, y2, y3]: [f32; 4], t: f32) -> f32 {
        match self {
            Segment::Linear => y1 + (y2 - y1) * t,
            Segment::Cosine => y1 + (y2 - y1) * (1.0 - (t * PI).cos()) * 0.5,
            Segment::Curve { tension, bias } => {
                let half = (1.0 - tension) * 0.5;
                let m0 = (y1 - y0) * (1.0 + bias) * half + (y2 - y1) * (1.0 - bias) * half;
                let m1 = (y2 - y1) * (1.0 + bias) * half + (y3 - y2) * (1.0 - bias) * half;
                let (t2, t3) = (t * t, t * t * t);
                let a0 = 2.0 * t3 - 3.0 * t2 + 1.0;
                let a1 = t3 - 2.0 * t2 + t;
                let a2 = t3 - t2;
                let a3 = -2.0 * t3 + 3.0 * t2;
                a0 * y1 + a1 * m0 + a2 * m1 + a3 * y2
            }
            Segment::Exp { exp, inverse } => {
                if inverse && y2 < y1 {
                    y1 + (y2 - y1) * (1.0 - (1.0 - t).powf(exp))
                } else {
                    y1 + (y2 - y1) * t.powf(exp)
                }
            }
        }
    }
}

/// Breakpoint curve through `points` (sample index, value), sorted by index.
///
/// Before the first point and after the last one the curve holds.
pub fn breakpoints(points: &[(usize, f32)], size: usize, shape: Segment) -> Result<Vec<f32>> {
    if points.is_empty() {
        return Err(Error::InvalidFormat("breakpoint table needs at least one point".into()));
    }
    if points.windows(2).any(|w| w[0].0 > w[1].0) {
        return Err(Error::InvalidFormat("breakpoints must be sorted by index".into()));
    }

    let value = |k: usize| points[k.min(points.len() - 1)].1;
    let mut out = vec![0.0; size];
    let mut seg = 0;
    for (i, sample) in out.iter_mut().enumerate() {
        while seg + 1 < points.len() && points[seg + 1].0 <= i {
            seg += 1;
        }
        let (x0, y0) = points[seg];
        *sample = match points.get(seg + 1) {
            Some(&(x1, _)) if i >= x0 && x1 > x0 => {
                let t = (i - x0) as f32 / (x1 - x0) as f32;
                let neighbours = [value(seg.saturating_sub(1)), y0, value(seg + 1), value(seg + 2)];
                shape.interpolate(neighbours, t)
            }
            _ => y0,
        };
    }
    Ok(out)
}

macro_rules! single_stream {
    ($ty:ty) => {
        impl Table for $ty {
            fn streams(&self) -> &[SharedTable] {
                std::slice::from_ref(&self.table)
            }
        }
    };
}

/// Harmonic series table.
#[derive(Debug, Clone)]
pub struct HarmTable {
    list: Vec<f32>,
    table: SharedTable,
}

impl HarmTable {
    pub fn new(list: Vec<f32>, size: usize) -> Result<Self> {
        let size = check_size(size)?;
        let table = SharedTable::new(harmonics(&list, size));
        Ok(Self { list, table })
    }

    pub fn list(&self) -> &[f32] {
        &self.list
    }

    pub fn replace(&mut self, list: Vec<f32>) {
        self.table.replace(harmonics(&list, self.size()));
        self.list = list;
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let size = check_size(size)?;
        self.table.replace(harmonics(&self.list, size));
        Ok(())
    }
}

impl Default for HarmTable {
    fn default() -> Self {
        Self {
            list: vec![1.0, 0.0],
            table: SharedTable::new(harmonics(&[1.0, 0.0], DEFAULT_SIZE)),
        }
    }
}

single_stream!(HarmTable);

fn saw_list(order: usize) -> Vec<f32> {
    (1..=order).map(|i| 1.0 / i as f32).collect()
}

fn square_list(order: usize) -> Vec<f32> {
    (1..order * 2)
        .map(|i| if i % 2 == 1 { 1.0 / i as f32 } else { 0.0 })
        .collect()
}

/// Band-limited sawtooth built from `order` harmonics.
#[derive(Debug, Clone)]
pub struct SawTable {
    order: usize,
    table: SharedTable,
}

impl SawTable {
    pub fn new(order: usize, size: usize) -> Result<Self> {
        let size = check_size(size)?;
        Ok(Self {
            order,
            table: SharedTable::new(harmonics(&saw_list(order), size)),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn set_order(&mut self, order: usize) {
        self.order = order;
        self.table.replace(harmonics(&saw_list(order), self.size()));
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let size = check_size(size)?;
        self.table.replace(harmonics(&saw_list(self.order), size));
        Ok(())
    }
}

single_stream!(SawTable);

/// Band-limited square built from the odd harmonics up to `order * 2 - 1`.
#[derive(Debug, Clone)]
pub struct SquareTable {
    order: usize,
    table: SharedTable,
}

impl SquareTable {
    pub fn new(order: usize, size: usize) -> Result<Self> {
        let size = check_size(size)?;
        Ok(Self {
            order,
            table: SharedTable::new(harmonics(&square_list(order), size)),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn set_order(&mut self, order: usize) {
        self.order = order;
        self.table.replace(harmonics(&square_list(order), self.size()));
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let size = check_size(size)?;
        self.table.replace(harmonics(&square_list(self.order), size));
        Ok(())
    }
}

single_stream!(SquareTable);

/// Chebyshev waveshaping table.
#[derive(Debug, Clone)]
pub struct ChebyTable {
    list: Vec<f32>,
    table: SharedTable,
}

impl ChebyTable {
    pub fn new(list: Vec<f32>, size: usize) -> Result<Self> {
        let size = check_size(size)?;
        let table = SharedTable::new(chebyshev(&list, size));
        Ok(Self { list, table })
    }

    pub fn list(&self) -> &[f32] {
        &self.list
    }

    pub fn replace(&mut self, list: Vec<f32>) {
        self.table.replace(chebyshev(&list, self.size()));
        self.list = list;
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let size = check_size(size)?;
        self.table.replace(chebyshev(&self.list, size));
        Ok(())
    }
}

single_stream!(ChebyTable);

#[derive(Debug, Clone)]
pub struct HannTable {
    table: SharedTable,
}

impl HannTable {
    pub fn new(size: usize) -> Result<Self> {
        let size = check_size(size)?;
        Ok(Self {
            table: SharedTable::new(hann(size)),
        })
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let size = check_size(size)?;
        self.table.replace(hann(size));
        Ok(())
    }
}

single_stream!(HannTable);

/// Breakpoint table. `LinTable`, `CosTable`, `CurveTable` and `ExpTable`
/// differ only in their [`Segment`] shape.
#[derive(Debug, Clone)]
pub struct BreakpointTable {
    points: Vec<(usize, f32)>,
    shape: Segment,
    table: SharedTable,
}

pub type LinTable = BreakpointTable;
pub type CosTable = BreakpointTable;
pub type CurveTable = BreakpointTable;
pub type ExpTable = BreakpointTable;

impl BreakpointTable {
    pub fn linear(points: Vec<(usize, f32)>, size: usize) -> Result<Self> {
        Self::with_shape(points, size, Segment::Linear)
    }

    pub fn cosine(points: Vec<(usize, f32)>, size: usize) -> Result<Self> {
        Self::with_shape(points, size, Segment::Cosine)
    }

    pub fn curve(points: Vec<(usize, f32)>, tension: f32, bias: f32, size: usize) -> Result<Self> {
        Self::with_shape(points, size, Segment::Curve { tension, bias })
    }

    pub fn exp(points: Vec<(usize, f32)>, exp: f32, inverse: bool, size: usize) -> Result<Self> {
        Self::with_shape(points, size, Segment::Exp { exp, inverse })
    }

    pub fn with_shape(points: Vec<(usize, f32)>, size: usize, shape: Segment) -> Result<Self> {
        let size = check_size(size)?;
        let table = SharedTable::new(breakpoints(&points, size, shape)?);
        Ok(Self { points, shape, table })
    }

    pub fn points(&self) -> &[(usize, f32)] {
        &self.points
    }

    pub fn shape(&self) -> Segment {
        self.shape
    }

    pub fn replace(&mut self, points: Vec<(usize, f32)>) -> Result<()> {
        self.table.replace(breakpoints(&points, self.size(), self.shape)?);
        self.points = points;
        Ok(())
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let size = check_size(size)?;
        self.table.replace(breakpoints(&self.points, size, self.shape)?);
        Ok(())
    }

    /// Redraw with another shape, e.g. a new tension or exponent.
    pub fn set_shape(&mut self, shape: Segment) -> Result<()> {
        self.table.replace(breakpoints(&self.points, self.size(), shape)?);
        self.shape = shape;
        Ok(())
    }
}

single_stream!(BreakpointTable);

/// Empty (or pre-filled) table of `length` seconds, one stream per channel.
#[derive(Debug, Clone)]
pub struct NewTable {
    sample_rate: f32,
    streams: Vec<SharedTable>,
}

impl NewTable {
    pub fn new(length: f32, chnls: usize, sample_rate: f32) -> Result<Self> {
        let size = check_size((length.max(0.0) * sample_rate).round() as usize)?;
        let streams = (0..chnls.max(1))
            .map(|_| SharedTable::new(vec![0.0; size]))
            .collect();
        Ok(Self {
            sample_rate,
            streams,
        })
    }

    /// Load `init` into every stream, or stream by stream when one list per
    /// channel is given. Lists are truncated or zero-padded to the table size.
    pub fn replace(&mut self, init: &[Vec<f32>]) -> Result<()> {
        if init.is_empty() {
            return Err(Error::EmptyBroadcastInput {
                param: "init".into(),
            });
        }
        let size = self.size();
        for (i, stream) in self.streams.iter().enumerate() {
            let mut data = init[i % init.len()].clone();
            data.resize(size, 0.0);
            stream.replace(data);
        }
        Ok(())
    }

    pub fn length(&self) -> f32 {
        self.size() as f32 / self.sample_rate
    }

    /// Oscillator frequency reading the table at its recorded speed.
    pub fn rate(&self) -> f32 {
        self.sample_rate / self.size() as f32
    }
}

impl Table for NewTable {
    fn streams(&self) -> &[SharedTable] {
        &self.streams
    }
}

/// Sound file loaded into memory, one stream per channel.
#[derive(Debug, Clone)]
pub struct SndTable {
    path: PathBuf,
    file_rate: f32,
    streams: Vec<SharedTable>,
}

impl SndTable {
    /// Load every channel of `path`, or only `chnl` when given.
    pub fn open(path: impl AsRef<Path>, chnl: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        let (channels, file_rate) = read_sound(path)?;
        let streams = match chnl {
            None => channels.into_iter().map(SharedTable::new).collect(),
            Some(c) => {
                let len = channels.len();
                let data = channels
                    .into_iter()
                    .nth(c)
                    .ok_or(Error::IndexOutOfRange { index: c, len })?;
                vec![SharedTable::new(data)]
            }
        };
        debug!(path = %path.display(), "sound table loaded");
        Ok(Self {
            path: path.to_path_buf(),
            file_rate,
            streams,
        })
    }

    /// Load another file, keeping the stream count. Missing channels wrap.
    pub fn set_sound(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (channels, file_rate) = read_sound(path)?;
        for (i, stream) in self.streams.iter().enumerate() {
            stream.replace(channels[i % channels.len()].clone());
        }
        self.path = path.to_path_buf();
        self.file_rate = file_rate;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dur(&self) -> f32 {
        self.size() as f32 / self.file_rate
    }

    /// Oscillator frequency reading the sound at its original pitch.
    pub fn rate(&self) -> f32 {
        self.file_rate / self.size().max(1) as f32
    }
}

impl Table for SndTable {
    fn streams(&self) -> &[SharedTable] {
        &self.streams
    }
}

/// Deinterleaved channels of a WAV file and its sample rate.
fn read_sound(path: &Path) -> Result<(Vec<Vec<f32>>, f32)> {
    let file = std::fs::File::open(path).map_err(|e| Error::from_io(e, path))?;
    let mut reader = hound::WavReader::new(std::io::BufReader::new(file))?;
    let spec = reader.spec();
    let nchannels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let frames = samples.len() / nchannels;
    if frames == 0 {
        return Err(Error::InvalidFormat(format!("{} holds no audio", path.display())));
    }
    let mut channels = vec![Vec::with_capacity(frames); nchannels];
    for frame in samples.chunks_exact(nchannels) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    Ok((channels, spec.sample_rate as f32))
}
