//! Recorders and their readers.
//!
//! Recording units run on the audio thread and only push into rtrb rings.
//! Everything that touches the filesystem happens on the control side: a
//! writer thread for [`Record`], explicit `write()` calls for the automation
//! recorders.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, warn};

use super::{
    impl_proxy, input_streams, setters,
    shared::{Trigger, TriggerUnit},
    unit, OutputKind, ProxyCore, Source, Streams,
};
use crate::{
    automation::{read_control_streams, read_note_streams, write_streams, ControlStream, NoteStream},
    broadcast::{Arg, Value},
    dsp::interp::Interp,
    engine::{Handle, Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

/// Container of a [`Record`] file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Wav,
    Aiff,
}

impl FileFormat {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(FileFormat::Wav),
            1 => Some(FileFormat::Aiff),
            _ => None,
        }
    }

    /// Format implied by a file extension, case-insensitive.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" | "wave" => Some(FileFormat::Wav),
            "aif" | "aiff" => Some(FileFormat::Aiff),
            _ => None,
        }
    }
}

/// Sample encoding of a [`Record`] file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleType {
    #[default]
    Int16,
    Int24,
    Int32,
    Float32,
    Float64,
}

impl SampleType {
    /// 0 16-bit, 1 24-bit, 2 32-bit int, 3 32-bit float, 4 64-bit float.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(SampleType::Int16),
            1 => Some(SampleType::Int24),
            2 => Some(SampleType::Int32),
            3 => Some(SampleType::Float32),
            4 => Some(SampleType::Float64),
            _ => None,
        }
    }

    fn wav_spec(self, channels: u16, sample_rate: u32) -> Result<hound::WavSpec> {
        let (bits_per_sample, sample_format) = match self {
            SampleType::Int16 => (16, hound::SampleFormat::Int),
            SampleType::Int24 => (24, hound::SampleFormat::Int),
            SampleType::Int32 => (32, hound::SampleFormat::Int),
            SampleType::Float32 => (32, hound::SampleFormat::Float),
            SampleType::Float64 => {
                return Err(Error::InvalidFormat("64-bit float samples are not supported".into()))
            }
        };
        Ok(hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        })
    }
}

// ---------------------------------------------------------------------------

/// Interleaves its inputs into the writer ring, a whole block or nothing.
struct RecordUnit {
    tx: Producer<f32>,
    chnls: usize,
    dropped: Arc<AtomicUsize>,
}

impl Processor for RecordUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let frames = out.len();
        if self.tx.slots() < frames * self.chnls {
            self.dropped.fetch_add(frames, Ordering::Relaxed);
        } else {
            for i in 0..frames {
                for k in 0..self.chnls {
                    let _ = self.tx.push(inputs.get(k)[i]);
                }
            }
        }
        out.fill(0.0);
    }
}

struct WavSink {
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    sample_type: SampleType,
}

impl WavSink {
    fn write(&mut self, sample: f32) -> Result<()> {
        let s = sample.clamp(-1.0, 1.0);
        match self.sample_type {
            SampleType::Int16 => self.writer.write_sample((s * i16::MAX as f32) as i16)?,
            SampleType::Int24 => self.writer.write_sample((s * 8_388_607.0) as i32)?,
            SampleType::Int32 => self.writer.write_sample((s as f64 * i32::MAX as f64) as i32)?,
            // unclamped, float files may exceed full scale
            _ => self.writer.write_sample(sample)?,
        }
        Ok(())
    }

    /// Drain until `done` is raised and the ring is empty.
    fn run(mut self, mut rx: Consumer<f32>, done: Arc<AtomicBool>) -> Result<()> {
        loop {
            let finished = done.load(Ordering::Acquire);
            while let Ok(sample) = rx.pop() {
                self.write(sample)?;
            }
            if finished {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.writer.finalize()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordParams {
    /// Channels in the file; inputs wrap when there are fewer streams
    pub chnls: usize,
    /// Used when the extension does not name a format
    pub fileformat: FileFormat,
    pub sampletype: SampleType,
    /// Ring size in units of 1024 frames
    pub buffering: usize,
}

impl Default for RecordParams {
    fn default() -> Self {
        Self {
            chnls: 2,
            fileformat: FileFormat::Wav,
            sampletype: SampleType::Int16,
            buffering: 4,
        }
    }
}

/// Writes its input streams to a sound file from the moment it is created.
///
/// The file is complete after [`Record::finish`] or when the object is
/// dropped.
pub struct Record {
    core: ProxyCore,
    path: PathBuf,
    done: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    writer: Option<JoinHandle<Result<()>>>,
}

impl Record {
    pub fn new(
        ctx: &EngineContext,
        input: &dyn Source,
        path: impl Into<PathBuf>,
        params: RecordParams,
    ) -> Result<Self> {
        let path = path.into();
        let streams = input_streams(input)?;
        if params.chnls == 0 {
            return Err(Error::EmptyBroadcastInput {
                param: "chnls".into(),
            });
        }

        let format = FileFormat::from_extension(&path).unwrap_or_else(|| {
            warn!(
                path = %path.display(),
                fallback = ?params.fileformat,
                "unrecognized extension, using the requested format"
            );
            params.fileformat
        });
        if format == FileFormat::Aiff {
            return Err(Error::InvalidFormat("AIFF output is not supported".into()));
        }
        let config = ctx.config();
        let spec = params
            .sampletype
            .wav_spec(params.chnls as u16, config.sample_rate as u32)?;
        let writer = hound::WavWriter::create(&path, spec)?;

        let capacity = params.buffering.max(1) * 1024 * params.chnls;
        let (tx, rx) = RingBuffer::new(capacity.max(config.block_size * params.chnls));
        let done = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicUsize::new(0));

        let sink = WavSink {
            writer,
            sample_type: params.sampletype,
        };
        let writer = thread::Builder::new().name("fanout-record".into()).spawn({
            let done = Arc::clone(&done);
            move || sink.run(rx, done)
        })?;

        let mut core = ProxyCore::new(ctx, OutputKind::ControlOnly, Vec::new());
        let inputs = (0..params.chnls).filter_map(|k| streams.wrap(k)).collect();
        let processor = RecordUnit {
            tx,
            chnls: params.chnls,
            dropped: Arc::clone(&dropped),
        };
        core.push_channel(vec![unit(processor, inputs)])?;
        debug!(path = %path.display(), chnls = params.chnls, "recording");

        Ok(Self {
            core,
            path,
            done,
            dropped,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames lost because the writer fell behind.
    pub fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop recording and close the file. Later calls do nothing.
    pub fn finish(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        self.core.stop()?;
        self.done.store(true, Ordering::Release);
        let result = writer
            .join()
            .unwrap_or_else(|_| Err(Error::Io(std::io::Error::other("record writer panicked"))));

        let dropped = self.dropped_frames();
        if dropped > 0 {
            warn!(path = %self.path.display(), dropped, "recording lost frames");
        }
        result
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            warn!(path = %self.path.display(), %err, "closing recording failed");
        }
    }
}

impl_proxy!(Record);

// ---------------------------------------------------------------------------

/// Ring size of the automation recorders, in seconds of points.
const AUTOMATION_SECONDS: f32 = 60.0;

fn automation_capacity(rate: f32, dur: f32) -> usize {
    let seconds = if dur > 0.0 { dur } else { AUTOMATION_SECONDS };
    ((rate * seconds) as usize).max(1) + 1
}

fn drain<T>(rx: &mut Consumer<T>, into: &mut Vec<T>) {
    while let Ok(point) = rx.pop() {
        into.push(point);
    }
}

/// Samples its input every `period` frames while playing.
struct ControlRecUnit {
    tx: Producer<(f64, f64)>,
    period: usize,
    countdown: usize,
    frames: u64,
    /// Frames after which recording ends, 0 for no limit
    limit: u64,
    dropped: Arc<AtomicUsize>,
}

impl Processor for ControlRecUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        for &x in inputs.get(0) {
            if self.limit > 0 && self.frames >= self.limit {
                break;
            }
            if self.countdown == 0 {
                let time = self.frames as f64 / ctx.sample_rate as f64;
                if let Err(PushError::Full(_)) = self.tx.push((time, x as f64)) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                self.countdown = self.period;
            }
            self.countdown -= 1;
            self.frames += 1;
        }
        out.fill(0.0);
    }

    fn autostart(&self) -> bool {
        false
    }

    fn on_play(&mut self) {
        self.countdown = 0;
        self.frames = 0;
    }
}

/// Records control streams as `time value` points.
///
/// Recording starts with `play()`; `write()` stores one file per input
/// stream under `<path>_NNN`.
pub struct ControlRec {
    core: ProxyCore,
    path: PathBuf,
    rings: Vec<Consumer<(f64, f64)>>,
    recorded: Vec<ControlStream>,
    dropped: Arc<AtomicUsize>,
}

impl ControlRec {
    /// `rate` points per second, for at most `dur` seconds (0 for no limit).
    pub fn new(
        ctx: &EngineContext,
        input: &dyn Source,
        path: impl Into<PathBuf>,
        rate: f32,
        dur: f32,
    ) -> Result<Self> {
        let streams = input_streams(input)?;
        let sample_rate = ctx.config().sample_rate;
        let rate = rate.clamp(1.0, sample_rate);
        let period = ((sample_rate / rate).round() as usize).max(1);
        let limit = (dur.max(0.0) * sample_rate).round() as u64;
        let dropped = Arc::new(AtomicUsize::new(0));

        let mut core = ProxyCore::new(ctx, OutputKind::ControlOnly, Vec::new());
        let mut rings = Vec::with_capacity(streams.len());
        for &id in streams.ids() {
            let (tx, rx) = RingBuffer::new(automation_capacity(rate, dur));
            let processor = ControlRecUnit {
                tx,
                period,
                countdown: 0,
                frames: 0,
                limit,
                dropped: Arc::clone(&dropped),
            };
            core.push_channel(vec![unit(processor, vec![id])])?;
            rings.push(rx);
        }

        Ok(Self {
            core,
            path: path.into(),
            recorded: vec![ControlStream::default(); rings.len()],
            rings,
            dropped,
        })
    }

    /// Pull recorded points off the audio thread.
    pub fn collect(&mut self) -> &[ControlStream] {
        for (rx, stream) in self.rings.iter_mut().zip(&mut self.recorded) {
            drain(rx, &mut stream.points);
        }
        &self.recorded
    }

    /// Write every stream recorded so far.
    pub fn write(&mut self) -> Result<Vec<PathBuf>> {
        self.collect();
        let lost = self.dropped.load(Ordering::Relaxed);
        if lost > 0 {
            warn!(path = %self.path.display(), lost, "control points lost, call collect() more often");
        }
        write_streams(&self.path, &self.recorded)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl_proxy!(ControlRec);

// ---------------------------------------------------------------------------

struct ControlReadUnit {
    values: Arc<[f32]>,
    pos: f64,
    rate: f32,
    looping: bool,
    interp: Interp,
    done: bool,
    trigger: Trigger,
}

impl Processor for ControlReadUnit {
    /// Without looping the last point lasts one period, then the reader
    /// outputs silence, raises its trigger and stops.
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        if self.values.is_empty() || self.done {
            out.fill(0.0);
            return;
        }
        let len = self.values.len() as f64;
        let step = self.rate as f64 / ctx.sample_rate as f64;

        for (i, o) in out.iter_mut().enumerate() {
            if self.pos >= len {
                if self.looping {
                    self.pos %= len;
                    self.trigger.raise(i);
                } else {
                    if !self.done {
                        self.done = true;
                        self.trigger.raise(i);
                    }
                    *o = 0.0;
                    continue;
                }
            }
            *o = self.interp.read(&self.values, self.pos as f32, self.looping);
            self.pos += step;
        }
    }

    fn finished(&self) -> bool {
        self.done
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "rate" => self.rate = value.expect_f32(name)?.max(0.0),
            "loop" => self.looping = value.expect_bool(name)?,
            "interp" => self.interp = Interp::from_index(value.expect_int(name)?),
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    fn on_play(&mut self) {
        self.pos = 0.0;
        self.done = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlReadParams {
    /// Values read per second
    pub rate: Arg,
    pub looping: Arg,
    /// 1 none, 2 linear, 3 cosine, 4 cubic
    pub interp: Arg,
    pub mul: Arg,
    pub add: Arg,
}

impl Default for ControlReadParams {
    fn default() -> Self {
        Self {
            rate: Arg::from(1000.0),
            looping: Arg::from(false),
            interp: Arg::from(2),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Plays back files written by [`ControlRec`], one stream per file.
pub struct ControlRead {
    core: ProxyCore,
    trig: Vec<Handle>,
}

impl ControlRead {
    pub fn new(ctx: &EngineContext, path: impl AsRef<Path>, params: ControlReadParams) -> Result<Self> {
        let path = path.as_ref();
        let files = read_control_streams(path)?;
        if files.is_empty() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let files: Vec<Arc<[f32]>> = files
            .into_iter()
            .map(|stream| stream.points.iter().map(|&(_, v)| v as f32).collect())
            .collect();

        let mut core = ProxyCore::new(
            ctx,
            OutputKind::ControlOnly,
            vec![
                ("rate", params.rate),
                ("loop", params.looping),
                ("interp", params.interp),
                ("mul", params.mul),
                ("add", params.add),
            ],
        );
        let args = core.broadcast(Some(files.len()))?;
        let mut triggers = Vec::with_capacity(args.len());
        for ch in 0..args.len() {
            let trigger = Trigger::new();
            let processor = ControlReadUnit {
                values: Arc::clone(&files[ch % files.len()]),
                pos: 0.0,
                rate: args.f32("rate", ch)?.max(0.0),
                looping: args.bool("loop", ch)?,
                interp: Interp::from_index(args.int("interp", ch)?),
                done: false,
                trigger: trigger.clone(),
            };
            core.push_channel(vec![unit(processor, vec![])])?;
            triggers.push(trigger);
        }
        // after the readers, so a trigger shows up in the block it was raised
        let trig = triggers
            .into_iter()
            .map(|t| ctx.add_unit(Box::new(TriggerUnit::new(t)), &[]))
            .collect::<Result<_>>()?;
        debug!(path = %path.display(), streams = files.len(), "control read");

        Ok(Self { core, trig })
    }

    /// Impulse streams firing at the end of each stream, or on every wrap
    /// when looping.
    pub fn trig(&self) -> Streams {
        Streams::new(self.trig.iter().map(Handle::id).collect())
    }

    setters! {
        set_rate => "rate",
        set_loop => "loop",
        set_interp => "interp",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(ControlRead);

// ---------------------------------------------------------------------------

/// Records `(time, pitch, velocity)` whenever either input changes.
struct NoteRecUnit {
    tx: Producer<(f64, f64, f64)>,
    last: (f32, f32),
    frames: u64,
    dropped: Arc<AtomicUsize>,
}

impl Processor for NoteRecUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        for (&pitch, &velocity) in inputs.get(0).iter().zip(inputs.get(1)) {
            if (pitch, velocity) != self.last {
                self.last = (pitch, velocity);
                let time = self.frames as f64 / ctx.sample_rate as f64;
                if let Err(PushError::Full(_)) = self.tx.push((time, pitch as f64, velocity as f64)) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            self.frames += 1;
        }
        out.fill(0.0);
    }

    fn autostart(&self) -> bool {
        false
    }

    fn on_play(&mut self) {
        self.frames = 0;
        self.last = (0.0, 0.0);
    }
}

/// Note events kept per voice.
const NOTE_CAPACITY: usize = 4096;

/// Records pitch/velocity pairs, one file per voice. Starts with `play()`.
pub struct NoteinRec {
    core: ProxyCore,
    path: PathBuf,
    rings: Vec<Consumer<(f64, f64, f64)>>,
    recorded: Vec<NoteStream>,
    dropped: Arc<AtomicUsize>,
}

impl NoteinRec {
    pub fn new(
        ctx: &EngineContext,
        pitch: &dyn Source,
        velocity: &dyn Source,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let pitch = input_streams(pitch)?;
        let velocity = input_streams(velocity)?;
        let voices = pitch.len().max(velocity.len());
        let dropped = Arc::new(AtomicUsize::new(0));

        let mut core = ProxyCore::new(ctx, OutputKind::ControlOnly, Vec::new());
        let mut rings = Vec::with_capacity(voices);
        for voice in 0..voices {
            let (tx, rx) = RingBuffer::new(NOTE_CAPACITY);
            let processor = NoteRecUnit {
                tx,
                last: (0.0, 0.0),
                frames: 0,
                dropped: Arc::clone(&dropped),
            };
            let inputs = pitch.wrap(voice).into_iter().chain(velocity.wrap(voice)).collect();
            core.push_channel(vec![unit(processor, inputs)])?;
            rings.push(rx);
        }

        Ok(Self {
            core,
            path: path.into(),
            recorded: vec![NoteStream::default(); voices],
            rings,
            dropped,
        })
    }

    pub fn collect(&mut self) -> &[NoteStream] {
        for (rx, stream) in self.rings.iter_mut().zip(&mut self.recorded) {
            drain(rx, &mut stream.points);
        }
        &self.recorded
    }

    pub fn write(&mut self) -> Result<Vec<PathBuf>> {
        self.collect();
        let lost = self.dropped.load(Ordering::Relaxed);
        if lost > 0 {
            warn!(path = %self.path.display(), lost, "note events lost");
        }
        write_streams(&self.path, &self.recorded)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl_proxy!(NoteinRec);

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteField {
    Pitch,
    Velocity,
}

/// Steps through timestamped note points, holding each value until the next.
struct NoteReadUnit {
    points: Arc<[(f64, f64, f64)]>,
    field: NoteField,
    next: usize,
    value: f32,
    frames: u64,
    looping: bool,
    done: bool,
    trigger: Option<Trigger>,
}

impl NoteReadUnit {
    fn duration(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.0)
    }

    fn restart(&mut self) {
        self.next = 0;
        self.frames = 0;
        self.done = false;
    }
}

impl Processor for NoteReadUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], ctx: &ProcessCtx) {
        let sr = ctx.sample_rate as f64;
        for (i, o) in out.iter_mut().enumerate() {
            let now = self.frames as f64 / sr;
            while let Some(&(time, pitch, velocity)) = self.points.get(self.next) {
                if time > now {
                    break;
                }
                self.value = match self.field {
                    NoteField::Pitch => pitch,
                    NoteField::Velocity => velocity,
                } as f32;
                self.next += 1;
            }

            if self.next >= self.points.len() && !self.done {
                self.done = true;
                if let Some(trigger) = &self.trigger {
                    trigger.raise(i);
                }
            }
            *o = self.value;
            self.frames += 1;

            let duration = self.duration();
            if self.looping && self.done && duration > 0.0 && self.frames as f64 / sr >= duration {
                self.restart();
            }
        }
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "loop" => self.looping = value.expect_bool(name)?,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    fn on_play(&mut self) {
        self.restart();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteinReadParams {
    pub looping: Arg,
    /// Applied to the velocity streams only
    pub mul: Arg,
    pub add: Arg,
}

impl Default for NoteinReadParams {
    fn default() -> Self {
        Self {
            looping: Arg::from(false),
            mul: Arg::from(1.0),
            add: Arg::from(0.0),
        }
    }
}

/// Plays back files written by [`NoteinRec`] as pitch/velocity pairs.
pub struct NoteinRead {
    core: ProxyCore,
    trig: Vec<Handle>,
}

impl NoteinRead {
    pub fn new(ctx: &EngineContext, path: impl AsRef<Path>, params: NoteinReadParams) -> Result<Self> {
        let path = path.as_ref();
        let files = read_note_streams(path)?;
        if files.is_empty() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let mut core = ProxyCore::new(
            ctx,
            OutputKind::ControlOnly,
            vec![
                ("loop", params.looping),
                ("mul", params.mul),
                ("add", params.add),
            ],
        )
        .post_on_member(1);
        let args = core.broadcast(Some(files.len()))?;
        let mut triggers = Vec::with_capacity(args.len());
        for ch in 0..args.len() {
            let points: Arc<[(f64, f64, f64)]> = files[ch % files.len()].points.as_slice().into();
            let looping = args.bool("loop", ch)?;
            let trigger = Trigger::new();
            let reader = |field, trigger| NoteReadUnit {
                points: Arc::clone(&points),
                field,
                next: 0,
                value: 0.0,
                frames: 0,
                looping,
                done: false,
                trigger,
            };
            core.push_channel(vec![
                unit(reader(NoteField::Pitch, None), vec![]),
                unit(reader(NoteField::Velocity, Some(trigger.clone())), vec![]),
            ])?;
            triggers.push(trigger);
        }
        let trig = triggers
            .into_iter()
            .map(|t| ctx.add_unit(Box::new(TriggerUnit::new(t)), &[]))
            .collect::<Result<_>>()?;

        Ok(Self { core, trig })
    }

    pub fn pitch(&self) -> Streams {
        self.core.member_streams(0)
    }

    pub fn velocity(&self) -> Streams {
        self.core.member_streams(1)
    }

    /// One impulse stream per voice, firing after its last event.
    pub fn trig(&self) -> Streams {
        Streams::new(self.trig.iter().map(Handle::id).collect())
    }

    setters! {
        set_loop => "loop",
        set_mul => "mul",
        set_add => "add",
    }
}

impl_proxy!(NoteinRead);
