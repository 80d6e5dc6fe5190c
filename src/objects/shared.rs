use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::{Inputs, ProcessCtx, Processor};

/// `f32` cell shared between units on the audio thread and the control side.
#[derive(Debug, Clone)]
pub(crate) struct SharedValue(Arc<AtomicU32>);

impl SharedValue {
    pub(crate) fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub(crate) fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

const NO_TRIGGER: usize = usize::MAX;

/// One-shot event raised by a reader unit and consumed by its trigger unit.
///
/// Holds the frame offset of the event inside the block it was raised in.
#[derive(Debug, Clone)]
pub(crate) struct Trigger(Arc<AtomicUsize>);

impl Trigger {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicUsize::new(NO_TRIGGER)))
    }

    pub(crate) fn raise(&self, frame: usize) {
        self.0.store(frame, Ordering::Release);
    }

    pub(crate) fn take(&self) -> Option<usize> {
        match self.0.swap(NO_TRIGGER, Ordering::Acquire) {
            NO_TRIGGER => None,
            frame => Some(frame),
        }
    }
}

/// Outputs a one-sample impulse wherever its trigger was raised.
pub(crate) struct TriggerUnit {
    trigger: Trigger,
}

impl TriggerUnit {
    pub(crate) fn new(trigger: Trigger) -> Self {
        Self { trigger }
    }
}

impl Processor for TriggerUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        out.fill(0.0);
        if let Some(frame) = self.trigger.take() {
            if let Some(last) = out.len().checked_sub(1) {
                out[frame.min(last)] = 1.0;
            }
        }
    }
}

/// Single-slot handover from the control side to one unit.
///
/// The unit polls with `try_take`, so a post in progress only delays the
/// handover by a block.
#[derive(Debug)]
pub(crate) struct Mailbox<T>(Arc<Mutex<Option<T>>>);

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Mailbox<T> {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub(crate) fn post(&self, value: T) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    pub(crate) fn try_take(&self) -> Option<T> {
        self.0.try_lock().ok().and_then(|mut slot| slot.take())
    }
}
